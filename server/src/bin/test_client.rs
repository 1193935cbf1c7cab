use clap::Parser;
use log::{debug, info};
use rand::Rng;
use shared::{Role, ServerLine, ECHO_COUNT};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Headless player: joins, prints what the server says and answers vote prompts.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:12345")]
    server: String,

    /// Display name sent in the join handshake
    #[arg(short, long, default_value = "Tester")]
    name: String,

    /// Always vote for this echo instead of picking at random
    #[arg(short, long)]
    vote: Option<u8>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let stream = TcpStream::connect(&args.server).await?;
    info!("Connected to {}", args.server);
    let (read_half, mut write_half) = stream.into_split();

    write_half
        .write_all(format!("{}\n", args.name).as_bytes())
        .await?;

    let mut lines = BufReader::new(read_half).lines();
    let mut role = Role::Explorer;
    let mut lie = None;

    while let Some(line) = lines.next_line().await? {
        match ServerLine::parse(&line) {
            ServerLine::Role(assigned) => {
                role = assigned;
                lie = None;
                println!("--- Your role is {} ---", role);
            }
            ServerLine::Echo { index, text } => println!("  [{}] {}", index, text),
            ServerLine::LieNote { index } => {
                lie = Some(index);
                println!("  (echo {} is the lie)", index);
            }
            ServerLine::VotePrompt => {
                let choice = match (args.vote, role, lie) {
                    (Some(fixed), _, _) => fixed,
                    (None, Role::Whisperer, Some(lie)) => lie,
                    _ => rand::thread_rng().gen_range(1..=ECHO_COUNT),
                };
                println!("> voting for echo {}", choice);
                write_half
                    .write_all(format!("{}\n", choice).as_bytes())
                    .await?;
            }
            ServerLine::Summary(text) => debug!("summary: {}", text),
            ServerLine::Plain(text) => println!("{}", text),
        }
    }

    info!("Server closed the connection");
    Ok(())
}
