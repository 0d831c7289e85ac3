//! Dashboard route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use cms_core::filter::unread_count;
use cms_core::records::ContrabandItem;
use cms_core::{Capability, ItemStatus};

use super::Shell;
use super::contraband::ItemRow;
use crate::error::AppError;
use crate::filters;
use crate::middleware::Officer;
use crate::state::AppState;

/// How many seizures the "Recent Seizures" panel lists.
const RECENT_SEIZURES: usize = 5;

/// Dashboard counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_seizures: usize,
    pub in_custody: usize,
    pub pending_destruction: usize,
    pub unread_messages: usize,
}

impl DashboardStats {
    fn count(items: &[ContrabandItem], unread_messages: usize) -> Self {
        let with_status =
            |status: ItemStatus| items.iter().filter(|item| item.status == status).count();
        Self {
            total_seizures: items.len(),
            in_custody: with_status(ItemStatus::InCustody),
            pending_destruction: with_status(ItemStatus::PendingDestruction),
            unread_messages,
        }
    }
}

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub shell: Shell,
    pub stats: DashboardStats,
    pub recent: Vec<ItemRow>,
    pub can_register: bool,
}

/// Dashboard page handler.
#[instrument(skip(officer, state), fields(user_id = %officer.id()))]
pub async fn dashboard(
    officer: Officer,
    State(state): State<AppState>,
) -> Result<DashboardTemplate, AppError> {
    let mut shell = Shell::new(&officer, "dashboard").await;
    let caller = officer.caller();

    let (items, messages) = tokio::join!(
        state.api().items(&caller, None),
        state.api().messages(&caller)
    );
    let items = shell.or_toast(items, "seizures")?;
    let messages = shell.or_toast(messages, "messages")?;

    Ok(DashboardTemplate {
        stats: DashboardStats::count(&items, unread_count(&messages, officer.id())),
        recent: items.iter().take(RECENT_SEIZURES).map(ItemRow::from).collect(),
        can_register: officer.can(Capability::RegisterSeizure),
        shell,
    })
}
