// Écran admin des commandes, côté client: appels API, debounce, séquençage des réponses
pub mod api;
pub mod debounce;
pub mod sequencer;
pub mod admin_orders;

pub use admin_orders::{AdminOrdersView, ViewState};
pub use api::{ClientError, MarketplaceClient, OrderFeed};
pub use debounce::Debouncer;
pub use sequencer::{RequestSequencer, RequestTag};
