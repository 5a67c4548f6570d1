// libs/notification-cell/src/services/dispatch.rs
//
// Best-effort delivery of appointment events over email and push. Every
// failure is logged and swallowed: the booking that triggered the event has
// already committed and must never be affected from here.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use scheduling_cell::collaborators::{AppointmentEvent, AppointmentNotifier};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

pub struct DispatchNotifier {
    supabase: Arc<SupabaseClient>,
    http: reqwest::Client,
    config: Arc<AppConfig>,
}

impl DispatchNotifier {
    pub fn new(config: Arc<AppConfig>, supabase: Arc<SupabaseClient>) -> Self {
        Self {
            supabase,
            http: reqwest::Client::new(),
            config,
        }
    }

    fn event_label(event: &AppointmentEvent) -> &'static str {
        match event {
            AppointmentEvent::Booked(_) => "booked",
            AppointmentEvent::Rescheduled(_) => "rescheduled",
            AppointmentEvent::Cancelled(_) => "cancelled",
        }
    }

    async fn patient_contact(&self, patient_id: Uuid) -> Result<(String, Option<String>)> {
        let path = format!(
            "/rest/v1/patients?id=eq.{}&select=email,supabase_user_id",
            patient_id
        );
        let rows: Vec<Value> = self.supabase.service_request(Method::GET, &path, None).await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Patient {} not found", patient_id))?;

        let email = row
            .get("email")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Patient {} has no email", patient_id))?
            .to_string();
        let user_id = row
            .get("supabase_user_id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        Ok((email, user_id))
    }

    async fn send_email(&self, event: &AppointmentEvent, to: &str) -> Result<()> {
        if !self.config.is_mail_configured() {
            debug!("Mail endpoint not configured, skipping email");
            return Ok(());
        }

        let appointment = event.appointment();
        let label = Self::event_label(event);
        let date_str = appointment.start_time.format("%d/%m/%Y").to_string();
        let time_str = appointment.start_time.format("%H:%M").to_string();

        let html = format!(
            "<p>Your appointment has been {}.</p><p>Date: {} at {}</p>",
            label, date_str, time_str
        );

        let body = json!({
            "from": self.config.mail_from_address,
            "to": to,
            "subject": format!("Appointment {}", capitalize(label)),
            "html": html,
        });

        let response = self
            .http
            .post(&self.config.mail_api_url)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("Mail endpoint returned {}", response.status()));
        }

        Ok(())
    }

    async fn send_push(&self, event: &AppointmentEvent, supabase_user_id: &str) -> Result<()> {
        if !self.config.is_push_configured() {
            debug!("Push gateway not configured, skipping push");
            return Ok(());
        }

        let path = format!(
            "/rest/v1/device_tokens?supabase_user_id=eq.{}&select=token",
            supabase_user_id
        );
        let rows: Vec<Value> = self.supabase.service_request(Method::GET, &path, None).await?;
        let tokens: Vec<String> = rows
            .iter()
            .filter_map(|row| row.get("token").and_then(|v| v.as_str()))
            .map(|s| s.to_string())
            .collect();

        if tokens.is_empty() {
            debug!("No device tokens registered for user {}", supabase_user_id);
            return Ok(());
        }

        let appointment = event.appointment();
        let label = Self::event_label(event);
        let body = json!({
            "tokens": tokens,
            "title": format!("Appointment {}", label),
            "body": appointment.start_time.format("%d/%m/%Y %H:%M").to_string(),
            "data": { "appointmentId": appointment.id },
        });

        let response = self
            .http
            .post(&self.config.push_api_url)
            .bearer_auth(&self.config.push_api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("Push gateway returned {}", response.status()));
        }

        Ok(())
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[async_trait]
impl AppointmentNotifier for DispatchNotifier {
    async fn dispatch(&self, event: AppointmentEvent) {
        let appointment_id = event.appointment().id;

        let (email, user_id) = match self.patient_contact(event.appointment().patient_id).await {
            Ok(contact) => contact,
            Err(e) => {
                warn!(
                    "Skipping notifications for appointment {}: {}",
                    appointment_id, e
                );
                return;
            }
        };

        if let Err(e) = self.send_email(&event, &email).await {
            warn!("Email notification failed for appointment {}: {}", appointment_id, e);
        }

        if let Some(user_id) = user_id {
            if let Err(e) = self.send_push(&event, &user_id).await {
                warn!("Push notification failed for appointment {}: {}", appointment_id, e);
            }
        }
    }
}
