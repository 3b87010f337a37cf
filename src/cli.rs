use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use uuid::Uuid;

/// Yoyaku — capacity-safe lunch reservation backend
#[derive(Parser)]
#[command(name = "yoyaku", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the reservation server
    Serve {
        /// Port to bind
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Operator tools for managing reservations
    Reservation {
        #[command(subcommand)]
        command: ReservationCommands,
    },
}

#[derive(Subcommand)]
pub enum ReservationCommands {
    /// List reservations, optionally for one date
    List {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Cancel a reservation (idempotent)
    Cancel {
        #[arg(long)]
        id: Uuid,
    },
    /// Block a slot by claiming all of its remaining seats
    Block {
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        slot: String,
        #[arg(long)]
        memo: Option<String>,
    },
}
