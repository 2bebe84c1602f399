//! Media asset selection

use tracing::debug;

use crate::resolver::Broadcast;

/// URL of the broadcast's asset with `required_subtype`.
///
/// Every matching entry replaces the previous pick, so the last match wins.
/// Entries without a URL are never picked.
pub fn select_asset<'a>(broadcast: &'a Broadcast, required_subtype: &str) -> Option<&'a str> {
    let mut selected = None;
    for media in &broadcast.media {
        let subtype = media.subtype.as_deref().unwrap_or("no key found");
        debug!("Media subtype: {}", subtype);
        if subtype != required_subtype {
            continue;
        }
        match media.url.as_deref() {
            Some(url) => {
                debug!("Remote Path: {}", url);
                selected = Some(url);
            }
            None => debug!("{} entry has no url, skipping", subtype),
        }
    }
    selected
}
