use crate::browser::{Browser, BrowserError};
use crate::engine::identifier::Identifier;
use crate::engine::parser::parse_last_upload;
use crate::engine::session::Session;
use crate::engine::state::RunState;
use log::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub passes: u32,
    pub removed: Vec<Identifier>,
    /// A row with a recent upload was reached.
    pub exhausted: bool,
}

enum Pass {
    Continue,
    Stop,
}

/// Removes contacts whose last upload is older than the inactivity threshold.
///
/// The listing is sorted oldest upload first, so the first active row ends the
/// whole operation.
pub async fn do_contacts_inactive_unfollow<B: Browser + ?Sized>(session: &mut Session<'_, B>, state: &mut RunState) -> PruneReport {
    let config = session.config;
    let mut report = PruneReport::default();
    let Some(url) = session.owner_url(state.owner.as_ref(), &config.urls.contacts_inactive) else {
        warn!("ACTION STOPPED : NO OWNER CONTACT URL");
        return report;
    };

    let passes = session.pacer.draw(config.batches.inactive_unfollow);
    while report.passes < passes {
        match prune_pass(session, state, &url, &mut report).await {
            Ok(Pass::Continue) => report.passes += 1,
            Ok(Pass::Stop) => break,
            Err(e) => {
                warn!("ACTION STOPPED : {}", e);
                break;
            }
        }
    }
    debug!("known -{}", report.removed.len());
    report
}

async fn prune_pass<B: Browser + ?Sized>(
    session: &mut Session<'_, B>,
    state: &mut RunState,
    url: &str,
    report: &mut PruneReport,
) -> Result<Pass, BrowserError> {
    let config = session.config;
    let selectors = &config.selectors;
    if !session.visit(url).await? {
        warn!("ACTION STOPPED : PAGE UNREACHABLE ({})", url);
        return Ok(Pass::Stop);
    }

    let rows = session.browser.count(&selectors.contact_table_rows).await?;
    for i in 0..rows {
        let text = session.browser.read_text(&selectors.contact_last_upload, i).await?;
        let last = parse_last_upload(&text, &config.locale);
        if !last.is_inactive(config.pruning.inactivity_threshold) {
            warn!("ACTION STOPPED : THERE ARE NO MORE INACTIVE USERS TO UNFOLLOW");
            report.exhausted = true;
            return Ok(Pass::Stop);
        }

        let contact = Identifier::new(session.browser.read_attribute_at(&selectors.contact_url, i, "href").await?);
        session.browser.click_nth(&selectors.contact_edit, i).await?;
        session.browser.click(&selectors.contact_check).await?;
        session.browser.click(&selectors.contact_remove).await?;
        state.known_contacts.remove(&contact);
        debug!("REMOVED {}", contact);
        report.removed.push(contact);
        session.humanize().await;
    }
    Ok(Pass::Continue)
}
