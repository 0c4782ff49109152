// src/player_client.rs
// Player client: registers with the hub, polls the call history, renders
// its tickets with live to-go progress and claims as soon as a ticket
// completes the active pattern.

use std::collections::HashSet;
use std::error::Error;
use std::time::Duration;

use clap::Parser;
use mainstage::api::{
    CallsResponse, ClaimRequest, ClaimResponse, PlayerTicketsResponse, RegisterRequest,
    RegisterResponse, StatusResponse,
};
use mainstage::config::ClientConfig;
use mainstage::score::WinPattern;
use mainstage::terminal;
use tokio::time::sleep;

#[derive(Parser)]
#[command(name = env!("CARGO_BIN_NAME"))]
#[command(about = "Mainstage player - watch tickets and claim wins")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Player name to register with (defaults to the configured name)
    #[arg(long)]
    name: Option<String>,

    /// Number of strips to buy on registration
    #[arg(long)]
    strips: Option<u32>,
}

struct PlayerClient {
    http_client: reqwest::Client,
    server_url: String,
    player_id: Option<String>,
    player_name: String,
}

impl PlayerClient {
    fn new(name: &str, config: &ClientConfig) -> Result<Self, Box<dyn Error>> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;
        Ok(Self {
            http_client,
            server_url: config.server_url(),
            player_id: None,
            player_name: name.to_string(),
        })
    }

    async fn register(&mut self, strips: u32) -> Result<RegisterResponse, Box<dyn Error>> {
        let request = RegisterRequest {
            name: self.player_name.clone(),
            strips: Some(strips),
        };
        let url = format!("{}/register", self.server_url);
        println!("Registering player '{}' with the hub...", self.player_name);

        let response = self.http_client.post(&url).json(&request).send().await?;
        if response.status().is_success() {
            let register_response: RegisterResponse = response.json().await?;
            self.player_id = Some(register_response.player_id.clone());
            println!("Registered. {}", register_response.message);
            Ok(register_response)
        } else {
            let error_text = response.text().await?;
            Err(format!("Registration failed: {error_text}").into())
        }
    }

    fn ensure_registered(&self) -> Result<&String, Box<dyn Error>> {
        self.player_id
            .as_ref()
            .ok_or_else(|| "Player is not registered".into())
    }

    async fn status(&self) -> Result<StatusResponse, Box<dyn Error>> {
        let url = format!("{}/status", self.server_url);
        Ok(self.http_client.get(&url).send().await?.json().await?)
    }

    async fn calls(&self) -> Result<CallsResponse, Box<dyn Error>> {
        let url = format!("{}/calls", self.server_url);
        Ok(self.http_client.get(&url).send().await?.json().await?)
    }

    async fn my_tickets(&self) -> Result<PlayerTicketsResponse, Box<dyn Error>> {
        let player_id = self.ensure_registered()?;
        let url = format!("{}/player/{}/tickets", self.server_url, player_id);
        let response = self.http_client.get(&url).send().await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let error_text = response.text().await?;
            Err(format!("Failed to fetch tickets: {error_text}").into())
        }
    }

    async fn claim(
        &self,
        serial: &str,
        pattern: WinPattern,
    ) -> Result<ClaimResponse, Box<dyn Error>> {
        let request = ClaimRequest {
            serial: serial.to_string(),
            pattern: Some(pattern),
        };
        let url = format!("{}/claim", self.server_url);
        let response = self.http_client.post(&url).json(&request).send().await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let error_text = response.text().await?;
            Err(format!("Claim refused: {error_text}").into())
        }
    }
}

async fn run_player(args: Args) -> Result<(), Box<dyn Error>> {
    let config = ClientConfig::load_or_default();
    let name = args.name.unwrap_or_else(|| config.player_name.clone());
    let strips = args.strips.unwrap_or(config.strips);

    let mut client = PlayerClient::new(&name, &config)?;
    client.register(strips).await?;

    // (serial, pattern) pairs already claimed this game, so a winning
    // ticket is claimed exactly once.
    let mut claimed: HashSet<(String, String)> = HashSet::new();

    loop {
        let status = client.status().await?;
        let calls = client.calls().await?;
        let tickets = client.my_tickets().await?;

        terminal::clear_screen();
        println!(
            "Player {} | game {} | pattern: {} | called {}",
            name, status.game_id, status.pattern, status.called
        );
        match calls.last {
            Some(number) => println!("Last number: \x1b[1;32m{number}\x1b[0m\n"),
            None => println!("Waiting for the first call...\n"),
        }

        for ticket in &tickets.tickets {
            terminal::print_ticket(&ticket.grid, &calls.calls, calls.last);
            terminal::print_ticket_progress(&ticket.serial, &ticket.evaluation);
            println!();
        }

        for ticket in &tickets.tickets {
            let key = (ticket.serial.clone(), tickets.pattern.to_string());
            if ticket.evaluation.is_winner && !claimed.contains(&key) {
                match client.claim(&ticket.serial, tickets.pattern).await {
                    Ok(response) => {
                        println!("\x1b[1;32mBINGO!\x1b[0m {}", response.message);
                        claimed.insert(key);
                    }
                    Err(e) => {
                        eprintln!("{e}");
                        // Refused claims are not retried on every poll.
                        claimed.insert(key);
                    }
                }
            }
        }

        if status.game_over {
            println!("GAME OVER - thanks for playing.");
            break;
        }

        sleep(Duration::from_secs(config.poll_interval)).await;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = run_player(args).await {
        eprintln!("Player client error: {e}");
        std::process::exit(1);
    }
}
