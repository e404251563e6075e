use color_eyre::eyre::{Result, bail};
use viisp_auth::{Config, SubmitMode, Ticket, TicketSubmission, ViispClient, telemetry};

const USAGE: &str = "usage: viisp-auth ticket <callback-url> | user-info <ticket>";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    color_eyre::install()?;
    telemetry::init_tracing();

    let config = Config::load()?;
    tracing::info!(
        test_mode = config.viisp.test_mode,
        service_id = %config.viisp.service_id,
        "Loaded configuration"
    );

    let args: Vec<String> = std::env::args().skip(1).collect();
    let client = ViispClient::new(&config)?;

    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["ticket", callback_url] => {
            let ticket = client.request_ticket(callback_url, None).await?;
            println!("{ticket}");

            if let TicketSubmission::Form { html } =
                client.submit_ticket(&ticket, SubmitMode::Form).await?
            {
                println!("{html}");
            }
        }
        ["user-info", ticket] => {
            let info = client.fetch_user_info(&Ticket::new(*ticket)).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        _ => bail!(USAGE),
    }

    Ok(())
}
