use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use thiserror::Error;

use crate::models::dto::OrderView;
use crate::models::users;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// Effet de bord "commande passée". Un échec ne remonte jamais jusqu'à la commande.
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    async fn order_placed(
        &self,
        recipient: &str,
        buyer: &users::Model,
        order: &OrderView,
    ) -> Result<(), NotifyError>;
}

/// Paramètres SMTP tirés de la config `serve`
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpNotifier {
    pub fn new(settings: &SmtpSettings) -> Result<Self, NotifyError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
            .port(settings.port);

        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            mailer: builder.build(),
            from_address: settings.from.clone(),
        })
    }
}

#[async_trait]
impl OrderNotifier for SmtpNotifier {
    async fn order_placed(
        &self,
        recipient: &str,
        buyer: &users::Model,
        order: &OrderView,
    ) -> Result<(), NotifyError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| NotifyError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(recipient
                .parse()
                .map_err(|_| NotifyError::InvalidAddress(recipient.to_string()))?)
            .subject(format!("Order {} confirmed", order.id))
            .header(ContentType::TEXT_PLAIN)
            .body(confirmation_text(buyer, order))?;

        self.mailer.send(email).await?;

        log::info!("Order confirmation for {} sent to {}", order.id, recipient);
        Ok(())
    }
}

/// Utilisé quand aucun serveur SMTP n'est configuré
pub struct LogNotifier;

#[async_trait]
impl OrderNotifier for LogNotifier {
    async fn order_placed(
        &self,
        recipient: &str,
        buyer: &users::Model,
        order: &OrderView,
    ) -> Result<(), NotifyError> {
        log::info!(
            "SMTP not configured, confirmation not sent to {}:\n{}",
            recipient,
            confirmation_text(buyer, order)
        );
        Ok(())
    }
}

/// Corps texte du mail de confirmation
pub fn confirmation_text(buyer: &users::Model, order: &OrderView) -> String {
    let name = buyer.display_name();
    let greeting = if name.is_empty() { "Hello".to_string() } else { format!("Hello {}", name) };

    let mut lines = vec![
        format!("{},", greeting),
        String::new(),
        format!("Your order {} has been placed.", order.id),
        String::new(),
    ];

    for item in &order.items {
        let label = item
            .product
            .as_ref()
            .map(|p| p.name.as_str())
            .unwrap_or("Unavailable product");
        lines.push(format!("- {} x{} @ {}", label, item.quantity, item.price));
    }

    lines.push(String::new());
    lines.push(format!("Total: {}", order.total_amount));

    if let Some(pickup) = &order.pickup_location {
        lines.push(format!(
            "Pickup: {}, {}, {}",
            pickup.name, pickup.address, pickup.city
        ));
        if let Some(contact) = &pickup.contact {
            lines.push(format!("Contact: {}", contact));
        }
    }

    lines.join("\n")
}

/// Best effort: acheteur sans email ignoré, échec journalisé puis abandonné
pub async fn notify_order_placed(
    notifier: &dyn OrderNotifier,
    buyer: &users::Model,
    order: &OrderView,
) {
    let Some(recipient) = buyer.email.as_deref().filter(|e| !e.trim().is_empty()) else {
        log::debug!("Buyer {} has no email, skipping confirmation", buyer.id);
        return;
    };

    if let Err(e) = notifier.order_placed(recipient, buyer, order).await {
        log::warn!("Order confirmation for {} failed: {}", order.id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dto::{OrderItemView, OrderProductSummary};
    use crate::models::order::OrderStatus;
    use crate::models::users::Role;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::sync::Mutex;

    struct Recording(Mutex<Vec<String>>);

    #[async_trait]
    impl OrderNotifier for Recording {
        async fn order_placed(
            &self,
            recipient: &str,
            _buyer: &users::Model,
            _order: &OrderView,
        ) -> Result<(), NotifyError> {
            self.0.lock().unwrap().push(recipient.to_string());
            Ok(())
        }
    }

    fn buyer(email: Option<&str>) -> users::Model {
        users::Model {
            id: "u1".to_string(),
            external_id: "ext".to_string(),
            first_name: Some("Jane".to_string()),
            last_name: Some("Doe".to_string()),
            email: email.map(str::to_string),
            phone: None,
            role: Role::Buyer,
            image_url: None,
            has_completed_onboarding: true,
            created_at: Utc::now(),
        }
    }

    fn order() -> OrderView {
        OrderView {
            id: "o1".to_string(),
            status: OrderStatus::Pending,
            total_amount: Decimal::from(250),
            created_at: Utc::now(),
            pickup_location: None,
            buyer: None,
            items: vec![
                OrderItemView {
                    id: "i1".to_string(),
                    product_id: Some("p1".to_string()),
                    quantity: 2,
                    price: Decimal::from(100),
                    product: Some(OrderProductSummary {
                        id: "p1".to_string(),
                        name: "Brake disc".to_string(),
                        images: vec![],
                    }),
                },
                OrderItemView {
                    id: "i2".to_string(),
                    product_id: None,
                    quantity: 1,
                    price: Decimal::from(50),
                    product: None,
                },
            ],
        }
    }

    #[test]
    fn test_confirmation_text_lists_items_and_total() {
        let text = confirmation_text(&buyer(None), &order());
        assert!(text.starts_with("Hello Jane Doe,"));
        assert!(text.contains("- Brake disc x2 @ 100"));
        assert!(text.contains("- Unavailable product x1 @ 50"));
        assert!(text.contains("Total: 250"));
    }

    #[tokio::test]
    async fn test_buyer_without_email_is_skipped() {
        let notifier = Recording(Mutex::new(Vec::new()));

        notify_order_placed(&notifier, &buyer(None), &order()).await;
        notify_order_placed(&notifier, &buyer(Some("jane@example.com")), &order()).await;

        assert_eq!(*notifier.0.lock().unwrap(), vec!["jane@example.com".to_string()]);
    }
}
