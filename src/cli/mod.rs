// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and routes to Layer 2.
//
//   train   — fine-tune on an annotated corpus
//   eval    — score a corpus with the best checkpoint
//   correct — correct raw sentences, one JSON object per line
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Commands, CorrectArgs, EvalArgs, TrainArgs};
use std::io::{self, BufRead};

#[derive(Parser, Debug)]
#[command(
    name = "soft-masked-csc",
    version = "0.1.0",
    about = "Chinese spelling correction with Soft-Masked BERT."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Eval(args)    => run_eval(args),
            Commands::Correct(args) => run_correct(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on '{}'", args.train_corpus);
    let best_f1 = TrainUseCase::new(args.into()).execute()?;

    println!("Training complete. Best dev f1: {best_f1:.4}");
    Ok(())
}

fn run_eval(args: EvalArgs) -> Result<()> {
    use crate::application::eval_use_case::EvalUseCase;

    let scores = EvalUseCase::new(&args.checkpoint_dir, &args.corpus, &args.output_file).execute()?;
    println!(
        "f1: {:.4}, precision: {:.4}, recall: {:.4}, accuracy: {:.4}",
        scores.f1, scores.precision, scores.recall, scores.accuracy,
    );
    println!("Predictions written to '{}'", args.output_file);
    Ok(())
}

fn run_correct(args: CorrectArgs) -> Result<()> {
    use crate::application::correct_use_case::CorrectUseCase;

    let use_case  = CorrectUseCase::new(&args.checkpoint_dir)?;
    let sentences = if args.sentences.is_empty() {
        io::stdin()
            .lock()
            .lines()
            .collect::<io::Result<Vec<_>>>()
            .context("Cannot read sentences from stdin")?
    } else {
        args.sentences
    };

    for sentence in sentences.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let prediction = use_case.correct(sentence)?;
        println!(
            "{}",
            serde_json::json!({
                "text":     sentence,
                "new_text": prediction.predict,
                "mistakes": prediction.mistakes,
            })
        );
    }
    Ok(())
}
