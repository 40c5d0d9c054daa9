use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::message::{build_payload, share_url, SharePayload};
use crate::backend::{DataStore, MessageDispatcher, TechnicianFilter};
use crate::config::ShareConfig;
use crate::domain::{DeliveryMethod, NewShareEvent, ShareEvent, TechnicianId};
use crate::error::ServiceError;
use crate::session::TenantContext;
use crate::validation::required;

/// Share dialog input. The default is the blank form: no name, no contact,
/// email selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareForm {
    pub customer_name: String,
    #[serde(default = "default_method")]
    pub delivery_method: DeliveryMethod,
    #[serde(alias = "contact_info")]
    pub contact: String,
}

fn default_method() -> DeliveryMethod {
    DeliveryMethod::Email
}

impl Default for ShareForm {
    fn default() -> Self {
        Self {
            customer_name: String::new(),
            delivery_method: default_method(),
            contact: String::new(),
        }
    }
}

impl ShareForm {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Outcome of a successful share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareReceipt {
    pub event: ShareEvent,
    pub url: String,
    pub message: String,
    /// How long the confirmation stays up before the form resets.
    pub dismiss_after: Duration,
}

/// Records a share event, builds the link and sends it to the customer.
pub struct ShareWorkflow<S: ?Sized> {
    store: Arc<S>,
    dispatcher: Arc<dyn MessageDispatcher>,
    config: ShareConfig,
}

impl<S> ShareWorkflow<S>
where
    S: DataStore + ?Sized,
{
    pub fn new(store: Arc<S>, dispatcher: Arc<dyn MessageDispatcher>, config: ShareConfig) -> Self {
        Self {
            store,
            dispatcher,
            config,
        }
    }

    /// The event is written before dispatch and is kept if dispatch fails.
    pub async fn share(
        &self,
        ctx: &TenantContext,
        technician_id: TechnicianId,
        form: &ShareForm,
    ) -> Result<ShareReceipt, ServiceError> {
        let customer_name = required(&form.customer_name, "customer name")?;
        let contact = required(&form.contact, "contact")?;

        let technician = self
            .store
            .technician(
                ctx.caller(),
                TechnicianFilter::owned_by(technician_id, ctx.company_id()),
            )
            .await?
            .ok_or_else(|| ServiceError::not_found("technician", technician_id))?;

        let share_token = Uuid::new_v4();
        let event = self
            .store
            .insert_share_event(
                ctx.caller(),
                NewShareEvent {
                    technician_id,
                    company_id: ctx.company_id(),
                    customer_name: customer_name.clone(),
                    delivery_method: form.delivery_method,
                    contact_info: contact.clone(),
                    share_token,
                },
            )
            .await?;

        let url = share_url(&self.config.public_origin, technician_id, share_token);
        let payload = build_payload(
            form.delivery_method,
            &contact,
            &customer_name,
            &technician.display_name(),
            &url,
        );

        let sent = match &payload {
            SharePayload::Email(email) => self.dispatcher.send_email(email).await,
            SharePayload::Sms(sms) => self.dispatcher.send_sms(sms).await,
        };
        if let Err(err) = sent {
            warn!(
                technician = %technician_id,
                method = %form.delivery_method,
                error = %err,
                "share recorded but delivery failed"
            );
            return Err(err.into());
        }

        info!(
            technician = %technician_id,
            method = %form.delivery_method,
            "profile shared"
        );
        Ok(ShareReceipt {
            message: format!("Profile shared successfully via {}!", form.delivery_method),
            event,
            url,
            dismiss_after: self.config.dismiss_after,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{InMemoryAuth, InMemoryPhotoStore, InMemoryStore, RecordingDispatcher};
    use crate::config::RosterConfig;
    use crate::error::ErrorKind;
    use crate::repository::TenantRepository;
    use crate::session::SessionStore;
    use crate::validation::TechnicianDraft;

    struct Harness {
        store: Arc<InMemoryStore>,
        dispatcher: Arc<RecordingDispatcher>,
        workflow: ShareWorkflow<InMemoryStore>,
        ctx: TenantContext,
        technician: TechnicianId,
    }

    async fn harness() -> Harness {
        let store = Arc::new(InMemoryStore::default());
        let sessions = SessionStore::new(Arc::new(InMemoryAuth::default()), store.clone());
        sessions
            .sign_up("owner@acme.test", "hunter22", "Acme HVAC", None)
            .await
            .expect("sign up");
        let ctx = sessions.context().expect("tenant");

        let repository = TenantRepository::new(
            store.clone(),
            Arc::new(InMemoryPhotoStore::default()),
            RosterConfig::default(),
            1024,
        );
        let technician = repository
            .create_technician(
                &ctx,
                TechnicianDraft {
                    first_name: "Jane".to_string(),
                    last_name: "Doe".to_string(),
                    title: "HVAC Tech".to_string(),
                    photo_url: None,
                    bio: None,
                    certifications: Vec::new(),
                    years_experience: None,
                    is_active: true,
                },
            )
            .await
            .expect("technician")
            .id;

        let dispatcher = Arc::new(RecordingDispatcher::default());
        let workflow = ShareWorkflow::new(
            store.clone(),
            dispatcher.clone(),
            ShareConfig {
                public_origin: "https://knock.example".to_string(),
                dismiss_after: Duration::from_millis(2_000),
            },
        );

        Harness {
            store,
            dispatcher,
            workflow,
            ctx,
            technician,
        }
    }

    fn email_form() -> ShareForm {
        ShareForm {
            customer_name: "Pat".to_string(),
            delivery_method: DeliveryMethod::Email,
            contact: "pat@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn email_share_records_event_and_sends_link() {
        let h = harness().await;
        let receipt = h
            .workflow
            .share(&h.ctx, h.technician, &email_form())
            .await
            .expect("share succeeds");

        assert_eq!(receipt.message, "Profile shared successfully via email!");
        assert_eq!(receipt.dismiss_after, Duration::from_secs(2));
        assert_eq!(
            receipt.url,
            format!(
                "https://knock.example/tech/{}?token={}",
                h.technician, receipt.event.share_token
            )
        );

        let emails = h.dispatcher.emails();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].to, "pat@example.com");
        assert_eq!(emails[0].subject, "Meet Your Technician: Jane Doe");
        assert!(emails[0].html.contains(&receipt.url));
        assert_eq!(h.store.share_events(), vec![receipt.event]);
    }

    #[tokio::test]
    async fn delivery_failure_keeps_the_event() {
        let h = harness().await;
        h.dispatcher.fail_with("SMS provider not configured");

        let form = ShareForm {
            delivery_method: DeliveryMethod::Sms,
            contact: "+15550100".to_string(),
            ..email_form()
        };
        let err = h
            .workflow
            .share(&h.ctx, h.technician, &form)
            .await
            .expect_err("dispatch fails");

        assert_eq!(err.kind(), ErrorKind::Delivery);
        assert!(err.to_string().contains("SMS provider not configured"));
        assert_eq!(h.store.share_events().len(), 1);
    }

    #[tokio::test]
    async fn blank_inputs_fail_before_recording() {
        let h = harness().await;
        let form = ShareForm {
            contact: "  ".to_string(),
            ..email_form()
        };
        let err = h
            .workflow
            .share(&h.ctx, h.technician, &form)
            .await
            .expect_err("contact required");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(h.store.share_events().is_empty());
        assert!(h.dispatcher.emails().is_empty());
    }

    #[tokio::test]
    async fn event_write_failure_stops_dispatch() {
        let h = harness().await;
        h.store.fail_table("share_events");
        let err = h
            .workflow
            .share(&h.ctx, h.technician, &email_form())
            .await
            .expect_err("insert fails");
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert!(h.dispatcher.emails().is_empty());
    }

    #[tokio::test]
    async fn unknown_technician_is_not_found() {
        let h = harness().await;
        let err = h
            .workflow
            .share(&h.ctx, TechnicianId(Uuid::new_v4()), &email_form())
            .await
            .expect_err("no such technician");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn reset_restores_blank_email_form() {
        let mut form = ShareForm {
            delivery_method: DeliveryMethod::Sms,
            ..email_form()
        };
        form.reset();
        assert_eq!(form, ShareForm::default());
        assert_eq!(form.delivery_method, DeliveryMethod::Email);
        assert!(form.customer_name.is_empty());
    }
}
