//! SNI fan-out
//!
//! Reality and WebSocket links are multiplied, one copy per SNI candidate.
//! Every other link passes through unchanged.

use tracing::trace;

use crate::parser::ProxyLink;

/// Expands base links across the SNI candidates.
///
/// Output order is base-link order outside, candidate order inside. A
/// fan-out link with no candidates produces nothing.
pub fn expand<S: AsRef<str>>(base_links: &[ProxyLink], sni_list: &[S]) -> Vec<ProxyLink> {
    let mut expanded = Vec::new();

    for base in base_links {
        if base.profile().is_fan_out() {
            trace!(
                "Fanning out '{}' ({}) across {} SNI candidate(s)",
                base.label,
                base.profile(),
                sni_list.len()
            );
            expanded.extend(sni_list.iter().map(|sni| base.with_sni(sni.as_ref())));
        } else {
            trace!("Passing through '{}' ({})", base.label, base.profile());
            expanded.push(base.clone());
        }
    }

    expanded
}

/// Whether any of the links would be fanned out
pub fn needs_sni(base_links: &[ProxyLink]) -> bool {
    base_links.iter().any(|l| l.profile().is_fan_out())
}
