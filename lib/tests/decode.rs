mod common;

use common::*;
use std::sync::Arc;
use trex::backtrace::{self, Decoder, HiddenFlags, PointerWidth};
use trex::frame::cache::FrameCache;
use trex::frame::LineNumber;
use trex::runtime::{Detached, Member};
use trex::{BackTrace, Error, ExceptionGraph, ExceptionNode, Platform, Settings};

#[test]
fn every_shape_decodes_the_same_methods() {
    let runtime = worker_runtime();
    let settings = Settings::default();

    let tokens = vec![
        BackTrace::slot_chunks(&[(WORKER as u32, 1), (WORKER as u32, 0), (THREAD as u32, 0)], 2)
            .unwrap(),
        BackTrace::pc_pairs(&[
            (WORKER_COMPUTE as u32, 4),
            (WORKER_RUN as u32, 17),
            (THREAD_RUN as u32, 3),
        ])
        .unwrap(),
        BackTrace::method_table(&[(WORKER_COMPUTE, 4), (WORKER_RUN, 17), (THREAD_RUN, 3)]).unwrap(),
        BackTrace::split_words(
            &[
                (WORKER as u32, WORKER_COMPUTE, 4),
                (WORKER as u32, WORKER_RUN, 17),
                (THREAD as u32, THREAD_RUN, 3),
            ],
            PointerWidth::Bits32,
        )
        .unwrap(),
    ];

    for token in &tokens {
        let decoder = backtrace::decode(token, &runtime, 3).unwrap();
        assert_eq!(decoder.depth(), 3);

        let members: Vec<_> = (0..3)
            .map(|index| decoder.frame_at(index, &settings))
            .map(|frame| frame.method.unwrap().member)
            .collect();
        assert_eq!(members, vec![Member::Index(1), Member::Index(0), Member::Index(0)]);

        let thread = decoder.frame_at(2, &settings);
        assert_eq!(thread.hidden, HiddenFlags::BOOT_CLASS_LOADER);
        assert!(decoder.frame_at(0, &settings).hidden.is_empty());
    }
}

#[test]
fn decoding_is_deterministic() {
    let runtime = worker_runtime();
    let settings = Settings::default();
    let token = worker_back_trace();
    let decoder = backtrace::decode(&token, &runtime, 3).unwrap();

    for index in 0..decoder.depth() {
        let first = decoder.frame_at(index, &settings);
        let second = decoder.frame_at(index, &settings);
        assert_eq!(first.method, second.method);
        assert_eq!(first.hidden, second.hidden);
        assert_eq!(first.byte_index, second.byte_index);
    }
}

#[test]
fn unknown_handles_are_unresolved() {
    let runtime = worker_runtime();
    let settings = Settings::default();

    let token = BackTrace::pc_pairs(&[(99, 1)]).unwrap();
    let decoder = backtrace::decode(&token, &runtime, 1).unwrap();
    let frame = decoder.frame_at(0, &settings);
    assert!(frame.method.is_none());
    assert_eq!(frame.hidden, HiddenFlags::UNRESOLVED);
    assert_eq!(frame.byte_index, Some(1));

    // Class known, method not: identity still exists, in the unresolved partition
    let token = BackTrace::split_words(&[(WORKER as u32, 99, 2)], PointerWidth::Bits64).unwrap();
    let decoder = backtrace::decode(&token, &runtime, 1).unwrap();
    let frame = decoder.frame_at(0, &settings);
    assert_eq!(frame.method.unwrap().member, Member::Unresolved(99));
    assert!(frame.hidden.contains(HiddenFlags::UNRESOLVED));
}

#[test]
fn unresolved_frames_render_from_raw_text() {
    let runtime = Arc::new(worker_runtime());
    let platform = Platform::new(runtime).with_cache(Arc::new(FrameCache::new()));

    let mut graph = ExceptionGraph::new();
    let node = graph.add(
        ExceptionNode::new("java.lang.Error", None)
            .with_frames(vec![raw("com.example.Gone", "vanish", "Gone.java", 5)])
            .with_back_trace(BackTrace::pc_pairs(&[(99, 2)]).unwrap()),
    );

    let settings = Settings::default();
    assert_eq!(
        platform.render(&graph, node, Some(&settings)).unwrap(),
        "java.lang.Error\n    -> Lcom/example/Gone;->vanish(?)?  [Gone.java:5:2]\n"
    );
}

#[test]
fn depth_mismatch_rederives_raw_frames() {
    let runtime = worker_runtime().with_rederived_frames(vec![
        raw("com.example.Worker", "run", "Worker.java", 12),
        raw("com.example.Worker", "compute", "Worker.java", 30),
    ]);
    let platform = Platform::new(Arc::new(runtime)).with_cache(Arc::new(FrameCache::new()));

    // Laid out for two raw frames, while the exception carries three
    let token = BackTrace::split_words(
        &[(WORKER as u32, WORKER_RUN, 4), (WORKER as u32, WORKER_COMPUTE, 9)],
        PointerWidth::Bits64,
    )
    .unwrap();
    let mut graph = ExceptionGraph::new();
    let node = graph.add(
        ExceptionNode::new("java.lang.Error", None)
            .with_frames(worker_frames())
            .with_back_trace(token),
    );

    let frames = platform.resolve_frames(&graph, node, None).unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].descriptor().as_str(), "Lcom/example/Worker;->run()V");
    assert_eq!(frames[0].line_number(), LineNumber::Line(12));
    assert_eq!(frames[0].byte_index(), Some(4));
    assert_eq!(frames[1].line_number(), LineNumber::Line(30));
    assert_eq!(frames[1].byte_index(), Some(9));
}

#[test]
fn irreconcilable_depth_falls_back_to_raw_frames() {
    let platform =
        Platform::new(Arc::new(worker_runtime())).with_cache(Arc::new(FrameCache::new()));
    let token = BackTrace::pc_pairs(&[(WORKER_RUN as u32, 17)]).unwrap();

    let mut graph = ExceptionGraph::new();
    let node = graph.add(
        ExceptionNode::new("java.lang.Error", Some("x"))
            .with_frames(worker_frames())
            .with_back_trace(token),
    );

    assert!(matches!(
        platform.resolve_frames(&graph, node, None),
        Err(Error::MalformedBackTrace(_))
    ));

    let settings = Settings::default();
    assert_eq!(
        platform.render(&graph, node, Some(&settings)).unwrap(),
        "java.lang.Error: x\n\
         \x20   -> Lcom/example/Worker;->compute(?)?  [Worker.java:30]\n\
         \x20   -> Lcom/example/Worker;->run(?)?  [Worker.java:12]\n\
         \x20   -> Ljava/lang/Thread;->run(?)?  [java.base/Thread.java:833]\n"
    );
}

#[test]
fn truncated_tokens_fall_back_to_raw_frames() {
    let mut graph = ExceptionGraph::new();
    let node = graph.add(
        ExceptionNode::new("java.lang.Error", None)
            .with_frames(vec![raw("a.B", "c", "B.java", 1)])
            .with_back_trace(BackTrace::PcPairs(vec![1, 2, 3])),
    );

    let settings = Settings::default();
    let platform = Platform::new(Arc::new(Detached));
    assert_eq!(
        platform.render(&graph, node, Some(&settings)).unwrap(),
        "java.lang.Error\n    -> La/B;->c(?)?  [B.java:1]\n"
    );
}
