use crate::domain::{models::notification::Notification, ports::NotificationService};
use crate::error::AppError;
use crate::infra::notify::templates;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tera::Tera;
use tracing::{debug, error};

/// Posts rendered notifications to the mail relay, one request per recipient.
pub struct HttpNotificationService {
    client: Client,
    api_url: String,
    api_key: String,
    templates: Tera,
}

impl HttpNotificationService {
    pub fn new(api_url: String, api_key: String) -> Result<Self, AppError> {
        Ok(Self {
            client: Client::new(),
            api_url,
            api_key,
            templates: templates::load()?,
        })
    }
}

#[derive(Serialize)]
struct EmailPayload<'a> {
    from_alias: &'a str,
    to_addr: &'a str,
    subject: &'a str,
    html_body: &'a str,
}

#[async_trait]
impl NotificationService for HttpNotificationService {
    async fn send(&self, notification: &Notification) -> Result<(), AppError> {
        let html_body = templates::render(&self.templates, notification)?;
        let subject = templates::default_subject(notification.kind);

        for recipient in &notification.recipients {
            let payload = EmailPayload {
                from_alias: "default",
                to_addr: recipient,
                subject,
                html_body: &html_body,
            };

            let res = self.client.post(&self.api_url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&payload)
                .send()
                .await
                .map_err(|e| {
                    let msg = format!("Mail relay connection error: {}", e);
                    error!("{}", msg);
                    AppError::InternalWithMsg(msg)
                })?;

            if !res.status().is_success() {
                let status = res.status();
                let text = res.text().await.unwrap_or_default();
                let msg = format!("Mail relay rejected notification. Status: {}, Body: {}", status, text);
                error!("{}", msg);
                return Err(AppError::InternalWithMsg(msg));
            }

            debug!(recipient = %recipient, kind = %notification.kind, "Notification delivered to relay");
        }

        Ok(())
    }
}
