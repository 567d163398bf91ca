mod analyze;
mod attack;
mod split;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{value_parser, ArgAction, Args, Parser, Subcommand, ValueEnum};

use crackaudit_core::{
    AttackMethod, HashFunction, Mask, DEFAULT_MASK, DEFAULT_MAX_LENGTH, DEFAULT_MIN_LENGTH,
    DEFAULT_WORDLIST, DEFAULT_WORKERS,
};

use analyze::analyze;
use attack::attack;
use split::split;

/// All the hash functions supported.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum HashFunctionArg {
    Md5,
    Sha1,
    Sha256,
    /// Approximated with MD5.
    Ntlm,
}

impl From<HashFunctionArg> for HashFunction {
    fn from(arg: HashFunctionArg) -> Self {
        match arg {
            HashFunctionArg::Md5 => HashFunction::Md5,
            HashFunctionArg::Sha1 => HashFunction::Sha1,
            HashFunctionArg::Sha256 => HashFunction::Sha256,
            HashFunctionArg::Ntlm => HashFunction::Ntlm,
        }
    }
}

/// All the attack methods.
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum MethodArg {
    /// Try every word of the wordlist.
    Dict,
    /// Try every variant of every word of the wordlist.
    Rule,
    /// Try every combination of the charset, for every length.
    Brute,
    /// Try every candidate matching the mask.
    Mask,
}

impl From<MethodArg> for AttackMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Dict => AttackMethod::Dict,
            MethodArg::Rule => AttackMethod::Rule,
            MethodArg::Brute => AttackMethod::Brute,
            MethodArg::Mask => AttackMethod::Mask,
        }
    }
}

/// Offline password strength auditing against hash digests.
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Log more details, can be repeated.
    #[clap(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[clap(subcommand)]
    commands: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Attack(Attack),
    Analyze(Analyze),
    Split(Split),
}

/// Find the password producing a certain hash digest.
#[derive(Args)]
pub struct Attack {
    /// The digest to attack, in hexadecimal.
    #[clap(value_parser = check_hex)]
    digest: String,

    /// The hash function that produced the digest.
    #[clap(long = "hash", value_enum, default_value_t = HashFunctionArg::Md5)]
    hash_function: HashFunctionArg,

    /// The attack to run.
    #[clap(short, long, value_enum, default_value_t = MethodArg::Dict)]
    method: MethodArg,

    /// The wordlist of the dict and rule attacks.
    #[clap(short, long, value_parser, default_value = DEFAULT_WORDLIST)]
    wordlist: PathBuf,

    /// The mask of the brute and mask attacks.
    /// Tokens are ?l (lowercase), ?u (uppercase), ?d (digits), ?s (specials) and ?a (all),
    /// any other character is taken literally.
    #[clap(short, long, value_parser = check_charset, default_value = DEFAULT_MASK)]
    charset: String,

    /// The minimum candidate length of the brute attack.
    #[clap(long, value_parser, default_value_t = DEFAULT_MIN_LENGTH)]
    min_length: usize,

    /// The maximum candidate length of the brute attack.
    #[clap(long, value_parser, default_value_t = DEFAULT_MAX_LENGTH)]
    max_length: usize,

    /// Stop the attack after this number of seconds.
    #[clap(short, long, value_parser = value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Print the final state of the attack as JSON.
    #[clap(long, value_parser)]
    json: bool,
}

/// Show statistics about the words of a wordlist.
#[derive(Args)]
pub struct Analyze {
    /// The wordlist to analyze.
    #[clap(value_parser)]
    wordlist: PathBuf,

    /// Print the statistics as JSON.
    #[clap(long, value_parser)]
    json: bool,
}

/// Split a brute force keyspace into work units.
#[derive(Args)]
pub struct Split {
    /// The mask whose characters are brute forced.
    #[clap(value_parser = check_charset)]
    charset: String,

    /// The minimum candidate length.
    #[clap(long, value_parser, default_value_t = DEFAULT_MIN_LENGTH)]
    min_length: usize,

    /// The maximum candidate length.
    #[clap(long, value_parser, default_value_t = DEFAULT_MAX_LENGTH)]
    max_length: usize,

    /// The number of workers to split the keyspace for.
    #[clap(short = 'n', long, value_parser = value_parser!(u64).range(1..), default_value_t = DEFAULT_WORKERS as u64)]
    workers: u64,
}

/// Checks if the mask expands to at least one character.
fn check_charset(charset: &str) -> Result<String> {
    if Mask::parse(charset).flatten().is_err() {
        bail!("The charset should contain at least one character");
    }

    Ok(charset.to_owned())
}

/// Checks if the digest is valid hexadecimal.
fn check_hex(hex: &str) -> Result<String> {
    hex::decode(hex.trim()).context("The digest is not valid hexadecimal")?;
    Ok(hex.trim().to_owned())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.commands {
        Commands::Attack(atk) => attack(atk)?,
        Commands::Analyze(analysis) => analyze(analysis)?,
        Commands::Split(split_args) => split(split_args)?,
    }

    Ok(())
}
