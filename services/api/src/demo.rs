use crate::infra::offline_services;
use clap::Args;
use knock_squared::backend::AuthError;
use knock_squared::domain::DeliveryMethod;
use knock_squared::error::{AppError, ServiceError};
use knock_squared::http::ServiceSettings;
use knock_squared::plans::catalog;
use knock_squared::sharing::ShareForm;

const DEMO_OWNER_EMAIL: &str = "owner@knock-demo.test";
const DEMO_OWNER_PASSWORD: &str = "demo-password";

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Company to sign up
    #[arg(long, default_value = "Acme HVAC")]
    pub(crate) company_name: String,
    /// Customer receiving the share link
    #[arg(long, default_value = "Pat Customer")]
    pub(crate) customer: String,
    /// Phone number the share SMS is addressed to
    #[arg(long, default_value = "+15550100")]
    pub(crate) sms_to: String,
    /// How many times the customer opens the shared profile
    #[arg(long, default_value_t = 3)]
    pub(crate) views: u32,
    /// Origin used when building share links
    #[arg(long, default_value = "http://localhost:3000")]
    pub(crate) public_origin: String,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        company_name,
        customer,
        sms_to,
        views,
        public_origin,
    } = args;

    let mut settings = ServiceSettings::default();
    settings.share.public_origin = public_origin.trim_end_matches('/').to_string();
    let (services, dispatcher) = offline_services(settings);

    println!("Knock Squared offline demo");
    let snapshot = services
        .sessions()
        .sign_up(DEMO_OWNER_EMAIL, DEMO_OWNER_PASSWORD, &company_name, None)
        .await?;
    let ctx = snapshot
        .context()
        .ok_or(ServiceError::Auth(AuthError::SessionExpired))?;
    println!(
        "- Signed up {} ({}) as {}",
        ctx.company.company_name,
        ctx.company_id(),
        DEMO_OWNER_EMAIL
    );

    let branding = services.repository.get_company_settings(&ctx).await?;
    println!(
        "- Branding: primary {} | secondary {}",
        branding.primary_color, branding.secondary_color
    );

    services.repository.seed_demo_technicians(&ctx).await?;
    let roster = services.repository.list_technicians(&ctx).await?;
    println!("\nRoster ({} technicians, newest first)", roster.len());
    for technician in &roster {
        println!(
            "  - {} | {} | {} yrs | {} certifications",
            technician.display_name(),
            technician.title,
            technician
                .years_experience
                .map(|years| years.to_string())
                .unwrap_or_else(|| "-".to_string()),
            technician.certifications.as_ref().map_or(0, Vec::len)
        );
    }

    let Some(featured) = roster.last() else {
        println!("\nNo technicians to share.");
        return Ok(());
    };

    let form = ShareForm {
        customer_name: customer,
        delivery_method: DeliveryMethod::Sms,
        contact: sms_to,
    };
    let receipt = services.sharing.share(&ctx, featured.id, &form).await?;
    println!("\nShared {} with {}", featured.display_name(), form.customer_name);
    println!("- {}", receipt.message);
    println!("- Link: {}", receipt.url);
    for text in dispatcher.texts() {
        println!("- SMS to {}: {}", text.to, text.message);
    }
    println!(
        "- Confirmation closes after {} ms",
        receipt.dismiss_after.as_millis()
    );

    for _ in 0..views {
        let profile = services.profiles.resolve(featured.id).await?;
        services.profiles.record_view(&profile).await;
    }

    let dashboard = services.analytics.dashboard(&ctx).await?;
    println!("\nAnalytics");
    println!(
        "- {} technicians | {} profile views | {} share links",
        dashboard.total_technicians, dashboard.total_profile_views, dashboard.total_share_links
    );
    if let Some(top) = &dashboard.most_viewed_technician {
        println!("- Most viewed: {} ({} views)", top.name, top.views);
    }
    for day in &dashboard.views_over_time {
        println!("  - {}: {} views", day.label, day.views);
    }

    println!("\nPlans");
    for plan in catalog() {
        let marker = if plan.popular { " (popular)" } else { "" };
        println!(
            "  - {}{}: {} | {}",
            plan.name,
            marker,
            plan.price_label(),
            plan.description
        );
    }

    Ok(())
}
