//! End-to-end tests of the boundary protocol: explicit heap traffic,
//! instance lifecycle, and the one-call driver.

use pegvm_bridge::{
    classify, ChannelBuffers, Driver, ParserModule, RunOutcome, RunStatus,
};

/// The full manual dance a foreign host would perform.
#[test]
fn manual_protocol_round_trip() {
    let mut module = ParserModule::new();

    let grammar = "row = field (\",\" field)*\nfield = [^,]+";
    let input = "alpha,beta,gamma";

    let grammar_region = module.allocate_bytes(grammar.as_bytes()).unwrap();
    let input_region = module.allocate_bytes(input.as_bytes()).unwrap();
    let engine = module.create_engine();
    let mut sink = ChannelBuffers::new();

    let status = module
        .interpret(&engine, grammar_region, input_region, &mut sink)
        .unwrap();

    assert_eq!(status, RunStatus::Matched);
    assert_eq!(sink.out(), input.as_bytes());
    assert!(sink.err().is_empty());

    module.release(input_region);
    module.release(grammar_region);
    module.destroy_engine(engine);
    assert_eq!(module.live_regions(), 0);
    assert_eq!(module.live_engines(), 0);
}

/// Region lengths are byte lengths, so multi-byte text must survive the
/// trip through the heap intact.
#[test]
fn multibyte_text_crosses_the_heap() {
    let mut module = ParserModule::new();

    let grammar = "any = .+";
    let input = "héllo 日本語";
    assert!(input.len() > input.chars().count());

    let grammar_region = module.allocate_bytes(grammar.as_bytes()).unwrap();
    let input_region = module.allocate_bytes(input.as_bytes()).unwrap();
    assert_eq!(input_region.len as usize, input.len());

    let engine = module.create_engine();
    let mut sink = ChannelBuffers::new();
    let status = module
        .interpret(&engine, grammar_region, input_region, &mut sink)
        .unwrap();

    assert_eq!(status, RunStatus::Matched);
    assert_eq!(sink.out(), input.as_bytes());

    module.release(input_region);
    module.release(grammar_region);
    module.destroy_engine(engine);
}

/// One engine instance can serve several runs back to back; each run gets
/// fresh channels and a reset arena.
#[test]
fn engine_instance_is_reusable() {
    let mut module = ParserModule::new();
    let engine = module.create_engine();

    for (grammar, input, want_match) in [
        ("num = \\d+", "42", true),
        ("num = \\d+", "nope", false),
        ("word = \\w+", "hello", true),
    ] {
        let grammar_region = module.allocate_bytes(grammar.as_bytes()).unwrap();
        let input_region = module.allocate_bytes(input.as_bytes()).unwrap();
        let mut sink = ChannelBuffers::new();

        let status = module
            .interpret(&engine, grammar_region, input_region, &mut sink)
            .unwrap();

        if want_match {
            assert_eq!(status, RunStatus::Matched);
            assert_eq!(sink.out(), input.as_bytes());
        } else {
            assert_eq!(status, RunStatus::Failed);
            assert!(sink.out().is_empty());
            assert!(!sink.err().is_empty());
        }

        module.release(input_region);
        module.release(grammar_region);
    }

    module.destroy_engine(engine);
}

#[test]
fn instances_are_independent() {
    let mut module = ParserModule::new();
    let first = module.create_engine();
    let second = module.create_engine();
    assert_ne!(first.id(), second.id());

    let grammar_region = module.allocate_bytes(b"a = \"x\"").unwrap();
    let input_region = module.allocate_bytes(b"x").unwrap();

    let mut sink = ChannelBuffers::new();
    let status = module
        .interpret(&second, grammar_region, input_region, &mut sink)
        .unwrap();
    assert_eq!(status, RunStatus::Matched);

    // Destroying one instance leaves the other usable
    module.destroy_engine(first);
    let mut sink = ChannelBuffers::new();
    let status = module
        .interpret(&second, grammar_region, input_region, &mut sink)
        .unwrap();
    assert_eq!(status, RunStatus::Matched);

    module.release(input_region);
    module.release(grammar_region);
    module.destroy_engine(second);
}

#[test]
fn driver_happy_path() {
    let mut driver = Driver::new();
    let outcome = driver
        .run("key = \\w+ \"=\" \\d+", "retries=3")
        .unwrap();
    assert_eq!(outcome, RunOutcome::Matched("retries=3".to_string()));
    assert_eq!(driver.live_regions(), 0);
    assert_eq!(driver.live_engines(), 0);
}

#[test]
fn driver_reports_grammar_errors() {
    let mut driver = Driver::new();
    let outcome = driver.run("a = [z-a]", "anything").unwrap();
    match outcome {
        RunOutcome::Failed(msg) => {
            assert!(msg.starts_with("grammar error: "), "got: {}", msg);
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(driver.live_regions(), 0);
}

#[test]
fn driver_reports_parse_failures_with_position() {
    let mut driver = Driver::new();
    let outcome = driver.run("pair = \\d+ \",\" \\d+", "12;34").unwrap();
    match outcome {
        RunOutcome::Failed(msg) => {
            assert!(msg.contains("1:3"), "got: {}", msg);
            assert!(msg.contains("\",\""), "got: {}", msg);
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

/// The channel classifier is a pure function of the two buffers.
#[test]
fn classification_prefers_the_result_channel() {
    assert_eq!(
        classify(b"result".to_vec(), b"stale diagnostics".to_vec()),
        RunOutcome::Matched("result".to_string())
    );
    assert_eq!(
        classify(Vec::new(), b"diagnostics".to_vec()),
        RunOutcome::Failed("diagnostics".to_string())
    );
}
