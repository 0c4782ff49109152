// src/caller_client.rs
// Interactive caller client: draws numbers, watches claims come in and
// adjudicates them against the ranked view from the hub.
//
// Interactive Controls:
// - ENTER: call the next number
// - A / R: accept / reject the top pending claim
// - N: start a new game
// - F5: refresh without calling
// - ESC: exit

use std::error::Error;
use std::time::Duration;

use clap::Parser;
use mainstage::api::{
    CallResponse, CallsResponse, ClaimsResponse, NewGameResponse, ResolveClaimRequest,
    ResolveClaimResponse, SetPatternRequest, StatusResponse,
};
use mainstage::config::ClientConfig;
use mainstage::defs::CALLER_ID;
use mainstage::terminal::{self, KeyAction};

#[derive(Parser)]
#[command(name = env!("CARGO_BIN_NAME"))]
#[command(about = "Mainstage caller - draw numbers and adjudicate claims")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Reset the game state before starting
    #[arg(long)]
    newgame: bool,

    /// Set the active pattern before starting (oneLine, twoLines, fullHouse)
    #[arg(long)]
    pattern: Option<String>,
}

struct CallerClient {
    http_client: reqwest::Client,
    server_url: String,
}

impl CallerClient {
    fn new(config: &ClientConfig) -> Result<Self, Box<dyn Error>> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;
        Ok(Self {
            http_client,
            server_url: config.server_url(),
        })
    }

    async fn check_connection(&self) -> Result<(), Box<dyn Error>> {
        let url = format!("{}/status", self.server_url);
        let response = self.http_client.get(&url).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("Server returned status: {}", response.status()).into())
        }
    }

    async fn status(&self) -> Result<StatusResponse, Box<dyn Error>> {
        let url = format!("{}/status", self.server_url);
        Ok(self.http_client.get(&url).send().await?.json().await?)
    }

    async fn calls(&self) -> Result<CallsResponse, Box<dyn Error>> {
        let url = format!("{}/calls", self.server_url);
        Ok(self.http_client.get(&url).send().await?.json().await?)
    }

    async fn claims(&self) -> Result<ClaimsResponse, Box<dyn Error>> {
        let url = format!("{}/claims", self.server_url);
        Ok(self.http_client.get(&url).send().await?.json().await?)
    }

    async fn call_number(&self) -> Result<CallResponse, Box<dyn Error>> {
        let url = format!("{}/call", self.server_url);
        let response = self
            .http_client
            .post(&url)
            .header("X-Player-Id", CALLER_ID)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let error_text = response.text().await?;
            Err(format!("Call refused: {error_text}").into())
        }
    }

    async fn resolve_claim(
        &self,
        claim_id: &str,
        accept: bool,
    ) -> Result<ResolveClaimResponse, Box<dyn Error>> {
        let url = format!("{}/resolveclaim", self.server_url);
        let request = ResolveClaimRequest {
            claim_id: claim_id.to_string(),
            accept,
        };
        let response = self
            .http_client
            .post(&url)
            .header("X-Player-Id", CALLER_ID)
            .json(&request)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let error_text = response.text().await?;
            Err(format!("Resolution refused: {error_text}").into())
        }
    }

    async fn new_game(&self) -> Result<NewGameResponse, Box<dyn Error>> {
        let url = format!("{}/newgame", self.server_url);
        let response = self
            .http_client
            .post(&url)
            .header("X-Player-Id", CALLER_ID)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let error_text = response.text().await?;
            Err(format!("New game refused: {error_text}").into())
        }
    }

    async fn set_pattern(&self, pattern: &str) -> Result<(), Box<dyn Error>> {
        let pattern = serde_json::from_value(serde_json::Value::String(pattern.to_string()))
            .map_err(|_| format!("Unknown pattern: {pattern}"))?;
        let url = format!("{}/pattern", self.server_url);
        let response = self
            .http_client
            .post(&url)
            .header("X-Player-Id", CALLER_ID)
            .json(&SetPatternRequest { pattern })
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            let error_text = response.text().await?;
            Err(format!("Pattern change refused: {error_text}").into())
        }
    }
}

fn show_claims(claims: &ClaimsResponse) {
    if claims.claims.is_empty() {
        return;
    }

    println!(
        "\nPending claims for {} ({} perfect, {} missed):",
        claims.pattern, claims.perfect, claims.missed
    );
    for entry in &claims.claims {
        let verdict = if entry.ranking.is_valid && entry.ranking.missed_by == 0 {
            "\x1b[1;32mvalid\x1b[0m".to_string()
        } else if entry.ranking.is_valid {
            format!("\x1b[1;33mmissed by {}\x1b[0m", entry.ranking.missed_by)
        } else {
            "\x1b[1;31minvalid\x1b[0m".to_string()
        };
        println!(
            "  {} ticket {} - {} ({} matched, {:.0}%)",
            entry.claim.id,
            entry.claim.serial,
            verdict,
            entry.ranking.matched_numbers,
            entry.ranking.percent_matched
        );
    }
}

async fn show_state(client: &CallerClient) -> Result<StatusResponse, Box<dyn Error>> {
    let status = client.status().await?;
    let calls = client.calls().await?;
    let claims = client.claims().await?;

    terminal::clear_screen();
    println!(
        "Game {} | pattern: {} | called {} | remaining {}",
        status.game_id, status.pattern, status.called, status.remaining
    );
    match calls.last {
        Some(number) => println!("Last number: \x1b[1;32m{number}\x1b[0m"),
        None => println!("No numbers called yet"),
    }
    println!();
    terminal::print_call_board(&calls.calls, calls.last);
    show_claims(&claims);

    Ok(status)
}

async fn run_caller(args: Args) -> Result<(), Box<dyn Error>> {
    let config = ClientConfig::load_or_default();
    let client = CallerClient::new(&config)?;

    print!("Connecting to hub at {}...", config.server_url());
    match client.check_connection().await {
        Ok(()) => println!(" ok."),
        Err(e) => {
            eprintln!(" failed: {e}");
            eprintln!("Make sure the mainstage server is running on {}", config.server_url());
            return Err(e);
        }
    }

    if args.newgame {
        let response = client.new_game().await?;
        println!("Started new game {}", response.game_id);
    }
    if let Some(pattern) = &args.pattern {
        client.set_pattern(pattern).await?;
        println!("Active pattern set to {pattern}");
    }

    loop {
        let status = show_state(&client).await?;

        if status.game_over {
            println!("\n\x1b[1;32mGAME OVER\x1b[0m - full house accepted or pouch empty.");
            println!("Start a new game with [N] or leave with [ESC].");
        }

        match terminal::wait_for_caller_action() {
            KeyAction::Call => match client.call_number().await {
                Ok(response) => {
                    println!("Called number: {}", response.number);
                }
                Err(e) => eprintln!("{e}"),
            },
            action @ (KeyAction::AcceptClaim | KeyAction::RejectClaim) => {
                let accept = action == KeyAction::AcceptClaim;
                match client.claims().await?.claims.first() {
                    Some(entry) => match client.resolve_claim(&entry.claim.id, accept).await {
                        Ok(resolved) => println!(
                            "Claim {} resolved as {:?}",
                            resolved.claim_id, resolved.status
                        ),
                        Err(e) => eprintln!("{e}"),
                    },
                    None => println!("No pending claims to resolve."),
                }
            }
            KeyAction::NewGame => match client.new_game().await {
                Ok(response) => println!("Started new game {}", response.game_id),
                Err(e) => eprintln!("{e}"),
            },
            KeyAction::Refresh => {}
            KeyAction::Quit => break,
        }
    }

    println!("Caller client exiting.");
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = run_caller(args).await {
        eprintln!("Caller client error: {e}");
        std::process::exit(1);
    }
}
