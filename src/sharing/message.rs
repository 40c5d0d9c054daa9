use uuid::Uuid;

use crate::backend::{EmailMessage, SmsMessage};
use crate::domain::{DeliveryMethod, TechnicianId, DEFAULT_SECONDARY_COLOR};

/// What gets handed to the dispatcher for one share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharePayload {
    Email(EmailMessage),
    Sms(SmsMessage),
}

/// `<origin>/tech/<technician>?token=<token>`.
pub fn share_url(public_origin: &str, technician: TechnicianId, token: Uuid) -> String {
    format!(
        "{}/tech/{technician}?token={token}",
        public_origin.trim_end_matches('/')
    )
}

pub fn build_payload(
    method: DeliveryMethod,
    contact: &str,
    customer_name: &str,
    technician_name: &str,
    url: &str,
) -> SharePayload {
    match method {
        DeliveryMethod::Email => SharePayload::Email(EmailMessage {
            to: contact.to_string(),
            subject: format!("Meet Your Technician: {technician_name}"),
            html: email_body(customer_name, technician_name, url),
        }),
        DeliveryMethod::Sms => SharePayload::Sms(SmsMessage {
            to: contact.to_string(),
            message: format!(
                "Hello {customer_name}! Your technician {technician_name} is ready to serve you. View their profile: {url}"
            ),
        }),
    }
}

fn email_body(customer_name: &str, technician_name: &str, url: &str) -> String {
    let customer = escape_html(customer_name);
    let technician = escape_html(technician_name);
    let href = escape_html(url);
    format!(
        concat!(
            "<h2>Hello {customer},</h2>\n",
            "<p>Your technician <strong>{technician}</strong> is ready to serve you!</p>\n",
            "<p>View their profile and qualifications here:</p>\n",
            "<p><a href=\"{href}\" style=\"background-color: {accent}; color: white; ",
            "padding: 12px 24px; text-decoration: none; border-radius: 6px; ",
            "display: inline-block;\">View Technician Profile</a></p>\n",
            "<p>We look forward to providing you with excellent service.</p>\n",
        ),
        customer = customer,
        technician = technician,
        href = href,
        accent = DEFAULT_SECONDARY_COLOR,
    )
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
