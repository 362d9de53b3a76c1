//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and one subcommand per demonstration:
//! - wait: racy read vs rendezvous
//! - interrupt / sleep: cooperative cancellation
//! - join / spawn / call: thread lifecycle
//! - counter / flag / once: shared state between threads

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use threadlab::demos::{CounterStrategy, InitMode};

/// threadlab - thread lifecycle demonstrations
#[derive(Parser, Debug)]
#[command(name = "threadlab")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print reports as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Producer/consumer handoff through a SignalBox
    Wait {
        /// Read without waiting for the producer
        #[arg(long, conflicts_with = "both")]
        racy: bool,

        /// Run the racy and the rendezvous variant one after the other
        #[arg(long)]
        both: bool,

        /// Override the producer delay in milliseconds
        #[arg(long)]
        producer_ms: Option<u64>,

        /// Override the consumer delay in milliseconds
        #[arg(long)]
        consumer_ms: Option<u64>,
    },

    /// Interrupt a counting worker
    Interrupt {
        /// Interrupt after this many milliseconds
        #[arg(short, long)]
        after_ms: Option<u64>,
    },

    /// Cancel a sleeping worker that cleans up its scratch files
    Sleep {
        /// Let the worker sleep to completion
        #[arg(long)]
        no_cancel: bool,

        /// Directory for scratch files
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Wait for a worker with join
    Join,

    /// Spawn named threads from a factory
    Spawn {
        /// Number of threads
        #[arg(short = 'n', long, default_value_t = 2)]
        count: usize,
    },

    /// Collect a value computed on another thread
    Call,

    /// Increment a shared counter from several threads
    Counter {
        /// racy, mutex, rwlock or atomic
        #[arg(short, long, default_value = "racy")]
        strategy: CounterStrategy,

        /// Number of threads
        #[arg(short, long)]
        threads: Option<usize>,
    },

    /// Stop a spinning worker with an atomic flag
    Flag,

    /// Initialize a shared instance from several threads at once
    Once {
        /// Use the unguarded check-then-set initialization
        #[arg(long)]
        unguarded: bool,

        /// Number of threads
        #[arg(short, long)]
        threads: Option<usize>,
    },
}

impl Commands {
    pub fn init_mode(unguarded: bool) -> InitMode {
        if unguarded {
            InitMode::CheckThenSet
        } else {
            InitMode::GetOrInit
        }
    }
}
