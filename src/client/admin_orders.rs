use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::client::api::OrderFeed;
use crate::client::debounce::Debouncer;
use crate::client::sequencer::RequestSequencer;
use crate::models::dto::{AdminOrderQuery, OrderView};
use crate::models::order::OrderStatus;

/// État affiché par l'écran
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub filters: AdminOrderQuery,
    pub orders: Vec<OrderView>,
    pub loading: bool,
    // une seule ligne en cours de mise à jour: ses boutons sont désactivés
    pub updating_order_id: Option<String>,
    pub toast: Option<String>,
}

/// Écran admin de recherche des commandes.
///
/// Le point de retrait, `search` et `reset` rechargent tout de suite; les champs texte
/// rechargent après le délai d'inactivité, avec les valeurs courantes au déclenchement.
/// Une réponse dépassée par une requête plus récente est ignorée.
pub struct AdminOrdersView {
    feed: Arc<dyn OrderFeed>,
    state: Mutex<ViewState>,
    debouncer: Debouncer,
    sequencer: RequestSequencer,
}

impl AdminOrdersView {
    pub fn new(feed: Arc<dyn OrderFeed>) -> Arc<Self> {
        Self::with_delay(feed, Debouncer::DEFAULT_DELAY)
    }

    pub fn with_delay(feed: Arc<dyn OrderFeed>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            feed,
            state: Mutex::new(ViewState::default()),
            debouncer: Debouncer::new(delay),
            sequencer: RequestSequencer::new(),
        })
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> ViewState {
        self.state().clone()
    }

    pub fn is_updating(&self, order_id: &str) -> bool {
        self.state().updating_order_id.as_deref() == Some(order_id)
    }

    /// Recharge avec les filtres courants
    pub async fn refresh(&self) {
        let tag = self.sequencer.issue();
        let filters = {
            let mut state = self.state();
            state.loading = true;
            state.filters.clone()
        };

        let result = self.feed.search_orders(&filters).await;

        if !self.sequencer.is_latest(tag) {
            log::debug!("Dropping superseded order search response");
            return;
        }

        let mut state = self.state();
        state.loading = false;
        match result {
            Ok(orders) => state.orders = orders,
            Err(e) => state.toast = Some(format!("Failed to load orders: {}", e)),
        }
    }

    pub async fn select_pickup_location(&self, pickup_location_id: Option<String>) {
        self.state().filters.pickup_location_id = pickup_location_id;
        self.debouncer.cancel();
        self.refresh().await;
    }

    pub fn set_order_id_text(self: &Arc<Self>, text: &str) {
        self.state().filters.order_id = Some(text.to_string());
        self.schedule_refresh();
    }

    pub fn set_email_text(self: &Arc<Self>, text: &str) {
        self.state().filters.email = Some(text.to_string());
        self.schedule_refresh();
    }

    fn schedule_refresh(self: &Arc<Self>) {
        let view = Arc::clone(self);
        self.debouncer.schedule(async move { view.refresh().await });
    }

    /// Bouton "Rechercher": immédiat, annule le debounce en attente
    pub async fn search(&self) {
        self.debouncer.cancel();
        self.refresh().await;
    }

    /// Bouton "Réinitialiser": vide les trois filtres puis recharge
    pub async fn reset(&self) {
        self.state().filters = AdminOrderQuery::default();
        self.debouncer.cancel();
        self.refresh().await;
    }

    /// Change le statut d'une ligne; en cas de succès la ligne locale est patchée
    pub async fn update_status(&self, order_id: &str, status: OrderStatus) -> bool {
        {
            let mut state = self.state();
            if state.updating_order_id.is_some() {
                return false;
            }
            state.updating_order_id = Some(order_id.to_string());
        }

        let result = self.feed.update_order_status(order_id, status).await;

        let mut state = self.state();
        state.updating_order_id = None;
        match result {
            Ok(updated) => {
                if let Some(row) = state.orders.iter_mut().find(|o| o.id == order_id) {
                    row.status = updated.status;
                }
                true
            }
            Err(e) => {
                state.toast = Some(format!("Failed to update order: {}", e));
                false
            }
        }
    }

    pub fn dismiss_toast(&self) {
        self.state().toast = None;
    }
}
