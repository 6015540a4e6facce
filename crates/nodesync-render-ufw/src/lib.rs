// # ufw Renderer
//
// Renders the firewall variant of the artifact: a ufw `user.rules` file in
// which one region, delimited by marker lines, is owned by the reconciler.
//
// ## Regions
//
// ```text
// *filter                          ┐
// :ufw-user-input - [0:0]          │ prefix (operator-owned, kept verbatim)
// ...                              ┘
// ### RULES ###                    ┐
// <static rules>                   │ generated region (rewritten every cycle)
// <one rule pair per address>      ┘
// ### END RULES ###                ┐
// COMMIT                           │ suffix (operator-owned, kept verbatim)
// ...                              ┘
// ```
//
// The renderer never touches the filesystem. The loop reads the existing
// file on its behalf (see `ConfigRenderer::uses_existing`).

use std::net::IpAddr;

use nodesync_core::config::RendererConfig;
use nodesync_core::registry::PluginRegistry;
use nodesync_core::traits::{ConfigRenderer, ConfigRendererFactory};
use nodesync_core::{AddressSet, Error, Result};

/// Line opening the generated region
pub const START_MARKER: &str = "### RULES ###";

/// Line closing the generated region
pub const END_MARKER: &str = "### END RULES ###";

/// Port opened to every member when none is configured
pub const DEFAULT_ALLOW_PORT: u16 = 27017;

/// ufw's chain for user-defined input rules
pub const DEFAULT_CHAIN: &str = "ufw-user-input";

/// Renderer for ufw `user.rules`
#[derive(Debug, Clone)]
pub struct UfwRenderer {
    /// Port each member address may reach
    allow_port: u16,

    /// Chain the accept directives are appended to
    chain: String,
}

impl UfwRenderer {
    /// Create a renderer opening `allow_port` to members on `chain`
    pub fn new(allow_port: u16, chain: impl Into<String>) -> Self {
        Self {
            allow_port,
            chain: chain.into(),
        }
    }

    /// Rules present in every generated region
    ///
    /// SSH stays reachable from anywhere so a bad member list can never
    /// lock operators out.
    pub fn static_rules(&self) -> Vec<String> {
        vec![
            String::new(),
            "### tuple ### allow any 22 0.0.0.0/0 any 0.0.0.0/0 in".to_string(),
            format!("-A {} -p tcp --dport 22 -j ACCEPT", self.chain),
            format!("-A {} -p udp --dport 22 -j ACCEPT", self.chain),
            String::new(),
        ]
    }

    /// The rule pair admitting one member, followed by a blank separator
    pub fn member_rules(&self, address: &IpAddr) -> [String; 3] {
        let any = match address {
            IpAddr::V4(_) => "0.0.0.0/0",
            IpAddr::V6(_) => "::/0",
        };

        [
            format!(
                "### tuple ### allow tcp {} {} any {} in",
                self.allow_port, any, address
            ),
            format!(
                "-A {} -p tcp --dport {} -s {} -j ACCEPT",
                self.chain, self.allow_port, address
            ),
            String::new(),
        ]
    }
}

impl Default for UfwRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOW_PORT, DEFAULT_CHAIN)
    }
}

/// Operator-owned parts of an existing `user.rules`
#[derive(Debug, Default, PartialEq, Eq)]
struct Regions<'a> {
    /// Lines strictly before the start marker
    prefix: &'a [String],

    /// Lines from the end marker onward, if the end marker exists
    suffix: Option<&'a [String]>,
}

impl<'a> Regions<'a> {
    /// Locate the markers in `lines`
    ///
    /// Marker lines match after trailing whitespace is trimmed, so a file
    /// saved with CRLF endings (each line ending in `\r`) keeps its regions.
    /// Without a start marker, everything before the end marker (or the
    /// whole file, when neither marker exists) is treated as prefix.
    fn split(lines: &'a [String]) -> Self {
        let start = lines.iter().position(|line| line.trim_end() == START_MARKER);
        let search_from = start.map_or(0, |i| i + 1);
        let end = lines[search_from..]
            .iter()
            .position(|line| line.trim_end() == END_MARKER)
            .map(|i| i + search_from);

        let prefix_end = start.or(end).unwrap_or(lines.len());

        Self {
            prefix: &lines[..prefix_end],
            suffix: end.map(|i| &lines[i..]),
        }
    }
}

impl ConfigRenderer for UfwRenderer {
    fn render(&self, addresses: &AddressSet, existing: Option<&[String]>) -> Vec<String> {
        let regions = existing.map(Regions::split).unwrap_or_default();

        if existing.is_some() && regions.suffix.is_none() {
            tracing::warn!(
                "Existing rules have no '{}' marker; closing the generated region",
                END_MARKER
            );
        }

        let mut lines = Vec::with_capacity(
            regions.prefix.len()
                + 6
                + addresses.len() * 3
                + regions.suffix.map_or(1, |suffix| suffix.len()),
        );

        lines.extend_from_slice(regions.prefix);
        lines.push(START_MARKER.to_string());
        lines.extend(self.static_rules());
        for address in addresses {
            lines.extend(self.member_rules(address));
        }

        match regions.suffix {
            Some(suffix) => lines.extend_from_slice(suffix),
            None => lines.push(END_MARKER.to_string()),
        }

        lines
    }

    fn uses_existing(&self) -> bool {
        true
    }

    fn renderer_name(&self) -> &'static str {
        "ufw"
    }
}

/// Factory for creating ufw renderers
pub struct UfwRendererFactory;

impl ConfigRendererFactory for UfwRendererFactory {
    fn create(&self, config: &RendererConfig) -> Result<Box<dyn ConfigRenderer>> {
        match config {
            RendererConfig::Ufw { allow_port, chain } => {
                Ok(Box::new(UfwRenderer::new(*allow_port, chain.clone())))
            }
            _ => Err(Error::config("Invalid config for ufw renderer")),
        }
    }
}

/// Register the ufw renderer with a registry
pub fn register(registry: &PluginRegistry) {
    registry.register_renderer("ufw", Box::new(UfwRendererFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(addresses: &[&str]) -> AddressSet {
        addresses.iter().map(|s| s.parse::<IpAddr>().unwrap()).collect()
    }

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn existing_rules() -> Vec<String> {
        lines(&[
            "*filter",
            ":ufw-user-input - [0:0]",
            ":ufw-user-output - [0:0]",
            "### RULES ###",
            "### tuple ### allow tcp 27017 0.0.0.0/0 any 10.9.9.9 in",
            "-A ufw-user-input -p tcp --dport 27017 -s 10.9.9.9 -j ACCEPT",
            "",
            "### END RULES ###",
            "",
            "### LOGGING ###",
            "COMMIT",
        ])
    }

    #[test]
    fn test_preserves_prefix_and_suffix() {
        let renderer = UfwRenderer::default();
        let existing = existing_rules();

        let output = renderer.render(&set(&["10.0.0.5"]), Some(&existing));

        assert_eq!(&output[..4], &existing[..4]);
        assert_eq!(&output[output.len() - 4..], &existing[7..]);
        assert!(!output.iter().any(|l| l.contains("10.9.9.9")));
    }

    #[test]
    fn test_exact_generated_region() {
        let renderer = UfwRenderer::default();
        let output = renderer.render(&set(&["10.0.0.5", "10.0.0.6"]), None);

        assert_eq!(
            output,
            lines(&[
                "### RULES ###",
                "",
                "### tuple ### allow any 22 0.0.0.0/0 any 0.0.0.0/0 in",
                "-A ufw-user-input -p tcp --dport 22 -j ACCEPT",
                "-A ufw-user-input -p udp --dport 22 -j ACCEPT",
                "",
                "### tuple ### allow tcp 27017 0.0.0.0/0 any 10.0.0.5 in",
                "-A ufw-user-input -p tcp --dport 27017 -s 10.0.0.5 -j ACCEPT",
                "",
                "### tuple ### allow tcp 27017 0.0.0.0/0 any 10.0.0.6 in",
                "-A ufw-user-input -p tcp --dport 27017 -s 10.0.0.6 -j ACCEPT",
                "",
                "### END RULES ###",
            ])
        );
    }

    #[test]
    fn test_empty_set_keeps_static_rules() {
        let renderer = UfwRenderer::default();
        let output = renderer.render(&AddressSet::new(), Some(&existing_rules()));

        assert!(output.contains(&"-A ufw-user-input -p tcp --dport 22 -j ACCEPT".to_string()));
        assert!(!output.iter().any(|l| l.contains("27017")));
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = UfwRenderer::default();
        let existing = existing_rules();
        let addresses = set(&["10.0.0.5", "10.0.0.6"]);

        assert_eq!(
            renderer.render(&addresses, Some(&existing)),
            renderer.render(&addresses, Some(&existing))
        );
    }

    #[test]
    fn test_rerender_of_own_output_is_stable() {
        let renderer = UfwRenderer::default();
        let addresses = set(&["10.0.0.5"]);

        let first = renderer.render(&addresses, Some(&existing_rules()));
        let second = renderer.render(&addresses, Some(&first));

        assert_eq!(first, second);
    }

    #[test]
    fn test_superset_only_adds_rules() {
        let renderer = UfwRenderer::default();
        let existing = existing_rules();

        let small = renderer.render(&set(&["10.0.0.5"]), Some(&existing));
        let large = renderer.render(&set(&["10.0.0.5", "10.0.0.6"]), Some(&existing));

        assert_eq!(large.len(), small.len() + 3);
        for line in &small {
            assert!(large.contains(line), "missing line {:?}", line);
        }
    }

    #[test]
    fn test_missing_end_marker_closes_region() {
        let renderer = UfwRenderer::default();
        let existing = lines(&["*filter", "### RULES ###", "stale"]);

        let output = renderer.render(&set(&["10.0.0.5"]), Some(&existing));

        assert_eq!(output[0], "*filter");
        assert_eq!(output[1], START_MARKER);
        assert_eq!(output.last().map(String::as_str), Some(END_MARKER));
        assert!(!output.contains(&"stale".to_string()));
    }

    #[test]
    fn test_missing_start_marker_keeps_lines_before_end_marker() {
        let renderer = UfwRenderer::default();
        let existing = lines(&["*filter", "### END RULES ###", "COMMIT"]);

        let output = renderer.render(&AddressSet::new(), Some(&existing));

        assert_eq!(output[0], "*filter");
        assert_eq!(output[1], START_MARKER);
        assert_eq!(&output[output.len() - 2..], &existing[1..]);
    }

    #[test]
    fn test_no_markers_keeps_whole_file_as_prefix() {
        let renderer = UfwRenderer::default();
        let existing = lines(&["*filter", "COMMIT"]);

        let output = renderer.render(&AddressSet::new(), Some(&existing));

        assert_eq!(&output[..2], &existing[..]);
        assert_eq!(output[2], START_MARKER);
        assert_eq!(output.last().map(String::as_str), Some(END_MARKER));
    }

    #[test]
    fn test_crlf_markers_are_found_and_suffix_kept_verbatim() {
        let renderer = UfwRenderer::default();
        let existing = lines(&[
            "*filter\r",
            "### RULES ###\r",
            "stale\r",
            "### END RULES ###\r",
            "COMMIT\r",
        ]);

        let output = renderer.render(&set(&["10.0.0.5"]), Some(&existing));

        assert_eq!(output[0], "*filter\r");
        assert_eq!(output[1], START_MARKER);
        assert!(!output.contains(&"stale\r".to_string()));
        assert_eq!(&output[output.len() - 2..], &existing[3..]);
    }

    #[test]
    fn test_ipv6_member_uses_ipv6_wildcard() {
        let renderer = UfwRenderer::default();
        let rules = renderer.member_rules(&"fd00::7".parse().unwrap());

        assert_eq!(rules[0], "### tuple ### allow tcp 27017 ::/0 any fd00::7 in");
        assert_eq!(
            rules[1],
            "-A ufw-user-input -p tcp --dport 27017 -s fd00::7 -j ACCEPT"
        );
    }

    #[test]
    fn test_custom_port_and_chain() {
        let renderer = UfwRenderer::new(6379, "ufw6-user-input");
        let rules = renderer.member_rules(&"10.0.0.5".parse().unwrap());

        assert_eq!(
            rules[1],
            "-A ufw6-user-input -p tcp --dport 6379 -s 10.0.0.5 -j ACCEPT"
        );
    }

    #[test]
    fn test_factory_creation() {
        let factory = UfwRendererFactory;

        let config = RendererConfig::Ufw {
            allow_port: 27017,
            chain: DEFAULT_CHAIN.to_string(),
        };
        let renderer = factory.create(&config).unwrap();
        assert_eq!(renderer.renderer_name(), "ufw");
        assert!(renderer.uses_existing());

        let wrong = RendererConfig::Nginx {
            upstreams: Vec::new(),
            weight: 100,
        };
        assert!(factory.create(&wrong).is_err());
    }

    #[test]
    fn test_register() {
        let registry = PluginRegistry::new();
        register(&registry);
        assert!(registry.has_renderer("ufw"));
    }
}
