use rand::SeedableRng;
use rand::rngs::StdRng;
use rs_reply_core::{CountStore, ReplyConfig, ReplyOrchestrator, Strategy, TaggedTextAnalyzer};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Load the count tables from the "data" directory (pmi.tsv, chain.tsv, head_rel.tsv)
    // Load automatically store.bin if existing
    let store = CountStore::open("./data")?;

    let mut config = ReplyConfig::default();

    // Tokens of the demo data are words, join them with a space
    config.separator = " ".to_owned();

    // Number of heads (so at most the number of replies) per input
    config.set_num_heads(3)?;

    // 'lang' follows the language model only, 'pmi' the relevance only,
    // 'both' multiplies them
    config.set_mode("both")?;

    // The first token is sampled among the 2 most relevant continuations,
    // the following ones are always the best candidate
    config.set_first_sample_width(2)?;

    // Run 10 generations per head and keep the shortest one
    config.set_strategy(Strategy::ShortestOf { trials: 10 })?;

    // Invalid settings are rejected
    match config.set_mode("bigram") {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("{e}"),
    }
    match config.set_maxlen(100_000) {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("{e}"),
    }

    let orchestrator = ReplyOrchestrator::from_store(&store, config)?;

    // A fixed seed makes the run reproducible
    let mut rng = StdRng::seed_from_u64(2024);

    // The analyzer expects pre-tagged text: surface/POS
    let inputs = [
        "How/ADV is/AUX the/DET weather/NOUN ?/PUNCT",
        "I/PRON want/VERB coffee/NOUN",
        "Time/NOUN to/PART sleep/VERB",
        "Hello/INTJ",
    ];

    for input in inputs {
        println!("> {input}");
        let replies = orchestrator.reply(&TaggedTextAnalyzer, input, &mut rng);
        if replies.is_empty() {
            println!("  (no reply)");
        }
        for reply in replies {
            println!("  [{:.3}] {} ({:?})", reply.score, reply.text, reply.termination);
        }
    }

    Ok(())
}
