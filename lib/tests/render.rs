mod common;

use common::*;
use parking_lot::Mutex;
use std::sync::Arc;
use trex::frame::cache::FrameCache;
use trex::frame::{LineNumber, RawFrame, ResolvedFrame};
use trex::printer::WriteSink;
use trex::{Error, ExceptionGraph, ExceptionNode, Platform, Settings, Style};

fn render(graph: &ExceptionGraph, root: trex::NodeId, settings: &Settings) -> String {
    Platform::detached()
        .render(graph, root, Some(settings))
        .unwrap()
}

fn main_frame() -> RawFrame {
    raw("x.Main", "main", "Main.java", 3)
}

#[test]
fn cycles_terminate_with_a_marker() {
    let mut graph = ExceptionGraph::new();
    let a = graph.add(
        ExceptionNode::new("java.lang.RuntimeException", Some("a")).with_frames(vec![
            raw("com.example.A", "fail", "A.java", 3),
            raw("com.example.Main", "main", "Main.java", 9),
        ]),
    );
    let b = graph.add(
        ExceptionNode::new("java.lang.IllegalStateException", Some("b")).with_frames(vec![
            raw("com.example.B", "fail", "B.java", 5),
            raw("com.example.Main", "main", "Main.java", 9),
        ]),
    );
    graph.set_cause(a, Some(b)).unwrap();
    graph.set_cause(b, Some(a)).unwrap();

    let text = render(&graph, a, &Settings::default());
    assert_eq!(
        text,
        "java.lang.RuntimeException: a\n\
         \x20   -> Lcom/example/A;->fail(?)?  [A.java:3]\n\
         \x20   -> Lcom/example/Main;->main(?)?  [Main.java:9]\n\
         Caused by: java.lang.IllegalStateException: b\n\
         \x20   -> Lcom/example/B;->fail(?)?  [B.java:5]\n\
         \x20   ... 1 more\n\
         Caused by: [CIRCULAR REFERENCE: java.lang.RuntimeException: a]\n"
    );
    assert_eq!(text.matches("CIRCULAR REFERENCE").count(), 1);
}

#[test]
fn display_ids_follow_first_visit() {
    let mut graph = ExceptionGraph::new();
    let a = graph.add(ExceptionNode::new("java.lang.RuntimeException", Some("a")));
    let b = graph.add(ExceptionNode::new("java.lang.IllegalStateException", Some("b")));
    graph.set_cause(a, Some(b)).unwrap();
    graph.add_suppressed(b, a).unwrap();

    let settings = Settings::builder().throwable_id_visible(true).build().unwrap();
    assert_eq!(
        render(&graph, a, &settings),
        "java.lang.RuntimeException<0>: a\n\
         Caused by: java.lang.IllegalStateException<1>: b\n\
         \x20   Suppressed: [CIRCULAR REFERENCE: java.lang.RuntimeException<0>: a]\n"
    );
}

#[test]
fn deep_recursion_collapses_to_one_frame() {
    let frame = raw("com.example.Deep", "recurse", "Deep.java", 7);
    let mut graph = ExceptionGraph::new();
    let node = graph.add(
        ExceptionNode::new("java.lang.StackOverflowError", None).with_frames(vec![frame; 50]),
    );

    for exact in [false, true] {
        let settings = Settings::builder()
            .duplicate_trace_max_size(8)
            .only_compare_hash_code_enabled(!exact)
            .build()
            .unwrap();
        assert_eq!(
            render(&graph, node, &settings),
            "java.lang.StackOverflowError\n\
             \x20   -> -- Lcom/example/Deep;->recurse(?)?  [Deep.java:7]\n\
             \x20   -> -- ... 49 more\n"
        );
    }

    let unchecked = Settings::builder()
        .check_duplicate_trace_enabled(false)
        .build()
        .unwrap();
    assert_eq!(render(&graph, node, &unchecked).lines().count(), 51);
}

#[test]
fn smallest_block_wins_at_each_position() {
    let a = raw("x.A", "a", "A.java", 1);
    let b = raw("x.B", "b", "B.java", 2);
    let mut graph = ExceptionGraph::new();
    let node = graph.add(ExceptionNode::new("java.lang.Error", None).with_frames(vec![
        a.clone(),
        a.clone(),
        b.clone(),
        a.clone(),
        a,
        b,
    ]));

    assert_eq!(
        render(&graph, node, &Settings::default()),
        "java.lang.Error\n\
         \x20   -> -- Lx/A;->a(?)?  [A.java:1]\n\
         \x20   -> -- ... 1 more\n\
         \x20   -> Lx/B;->b(?)?  [B.java:2]\n\
         \x20   -> -- Lx/A;->a(?)?  [A.java:1]\n\
         \x20   -> -- ... 1 more\n\
         \x20   -> Lx/B;->b(?)?  [B.java:2]\n"
    );
}

#[test]
fn repeated_blocks_print_once() {
    let frames: Vec<RawFrame> = (0..4)
        .flat_map(|_| {
            vec![
                raw("x.Parser", "expr", "Parser.java", 10),
                raw("x.Parser", "term", "Parser.java", 20),
                raw("x.Parser", "atom", "Parser.java", 30),
            ]
        })
        .chain(std::iter::once(main_frame()))
        .collect();
    let mut graph = ExceptionGraph::new();
    let node = graph.add(ExceptionNode::new("java.lang.Error", None).with_frames(frames));

    let text = render(&graph, node, &Settings::default());
    assert_eq!(
        text,
        "java.lang.Error\n\
         \x20   -> -- Lx/Parser;->expr(?)?  [Parser.java:10]\n\
         \x20   -> -- Lx/Parser;->term(?)?  [Parser.java:20]\n\
         \x20   -> -- Lx/Parser;->atom(?)?  [Parser.java:30]\n\
         \x20   -> -- ... 3 more\n\
         \x20   -> Lx/Main;->main(?)?  [Main.java:3]\n"
    );

    let small = Settings::builder().duplicate_trace_max_size(2).build().unwrap();
    assert_eq!(render(&graph, node, &small).lines().count(), 14);
}

#[test]
fn common_frames_are_folded() {
    let mut graph = ExceptionGraph::new();
    let outer = graph.add(
        ExceptionNode::new("java.lang.Exception", Some("outer")).with_frames(vec![
            raw("x.P", "p", "P.java", 1),
            raw("x.C", "c", "C.java", 2),
            main_frame(),
        ]),
    );
    let inner = graph.add(
        ExceptionNode::new("java.lang.Exception", Some("inner")).with_frames(vec![
            raw("x.Q", "q", "Q.java", 4),
            raw("x.C", "c", "C.java", 2),
            main_frame(),
        ]),
    );
    graph.set_cause(outer, Some(inner)).unwrap();

    let folded = "java.lang.Exception: outer\n\
                  \x20   -> Lx/P;->p(?)?  [P.java:1]\n\
                  \x20   -> Lx/C;->c(?)?  [C.java:2]\n\
                  \x20   -> Lx/Main;->main(?)?  [Main.java:3]\n\
                  Caused by: java.lang.Exception: inner\n\
                  \x20   -> Lx/Q;->q(?)?  [Q.java:4]\n\
                  \x20   ... 2 more\n";
    assert_eq!(render(&graph, outer, &Settings::default()), folded);

    let unfolded = Settings::builder().fold_enabled(false).build().unwrap();
    let text = render(&graph, outer, &unfolded);
    assert!(!text.contains("more"));
    assert_eq!(text.lines().count(), 8);
}

#[test]
fn folding_compares_resolved_and_raw_frames() {
    let runtime = Arc::new(worker_runtime());
    let platform = Platform::new(runtime).with_cache(Arc::new(FrameCache::new()));

    let mut graph = ExceptionGraph::new();
    let outer = graph.add(
        ExceptionNode::new("java.lang.RuntimeException", None)
            .with_frames(worker_frames())
            .with_back_trace(worker_back_trace()),
    );
    let mut inner_frames = vec![raw("com.example.Helper", "help", "Helper.java", 3)];
    inner_frames.extend(worker_frames().into_iter().skip(1));
    let inner = graph.add(ExceptionNode::new("java.io.IOException", None).with_frames(inner_frames));
    graph.set_cause(outer, Some(inner)).unwrap();

    let text = platform
        .render(&graph, outer, Some(&Settings::default()))
        .unwrap();
    assert!(text.ends_with(
        "Caused by: java.io.IOException\n\
         \x20   -> Lcom/example/Helper;->help(?)?  [Helper.java:3]\n\
         \x20   ... 2 more\n"
    ));
}

#[test]
fn suppressed_exceptions_are_indented() {
    let mut graph = ExceptionGraph::new();
    let root = graph.add(
        ExceptionNode::new("java.lang.Exception", Some("r")).with_frames(vec![main_frame()]),
    );
    let suppressed = graph.add(
        ExceptionNode::new("java.lang.Exception", Some("s"))
            .with_frames(vec![raw("x.S", "close", "S.java", 8), main_frame()]),
    );
    graph.add_suppressed(root, suppressed).unwrap();

    assert_eq!(
        render(&graph, root, &Settings::default()),
        "java.lang.Exception: r\n\
         \x20   -> Lx/Main;->main(?)?  [Main.java:3]\n\
         \x20   Suppressed: java.lang.Exception: s\n\
         \x20       -> Lx/S;->close(?)?  [S.java:8]\n\
         \x20       ... 1 more\n"
    );

    let jni = Settings::builder().style(Style::Jni).build().unwrap();
    assert_eq!(
        render(&graph, root, &jni),
        "java.lang.Exception: r\n\
         \tat x.Main.main(Main.java:3)\n\
         \tSuppressed: java.lang.Exception: s\n\
         \t\tat x.S.close(S.java:8)\n\
         \t\t... 1 more\n"
    );
}

#[test]
fn causes_repeated_in_the_message_merge_into_the_header() {
    let mut graph = ExceptionGraph::new();
    let outer = graph.add(
        ExceptionNode::new("java.lang.RuntimeException", Some("java.io.IOException: disk"))
            .with_frames(vec![main_frame()]),
    );
    let cause = graph.add(
        ExceptionNode::new("java.io.IOException", Some("disk"))
            .with_frames(vec![raw("x.Io", "read", "Io.java", 5), main_frame()]),
    );
    graph.set_cause(outer, Some(cause)).unwrap();

    let header = "java.lang.RuntimeException\n    java.io.IOException: disk";
    let platform = Platform::detached();
    assert_eq!(platform.describe(&graph, outer, None).unwrap(), header);

    let body = "\n    -> Lx/Main;->main(?)?  [Main.java:3]\n\
                Caused by: java.io.IOException: disk\n\
                \x20   -> Lx/Io;->read(?)?  [Io.java:5]\n\
                \x20   ... 1 more\n";
    assert_eq!(
        render(&graph, outer, &Settings::default()),
        format!("{}{}", header, body)
    );

    // A multi-line header closes the circular marker on its own line
    graph.set_cause(cause, Some(outer)).unwrap();
    assert!(render(&graph, outer, &Settings::default()).ends_with(
        "Caused by: [CIRCULAR REFERENCE: java.lang.RuntimeException\n\
         \x20   java.io.IOException: disk\n\
         ]\n"
    ));
}

#[test]
fn jni_style_with_resolved_frames() {
    let platform =
        Platform::new(Arc::new(worker_runtime())).with_cache(Arc::new(FrameCache::new()));
    let mut graph = ExceptionGraph::new();
    let node = graph.add(
        ExceptionNode::new("java.lang.IllegalStateException", Some("bad"))
            .with_frames(worker_frames())
            .with_back_trace(worker_back_trace()),
    );

    let settings = Settings::builder()
        .style(Style::Jni)
        .class_loader_name_visible(true)
        .module_version_visible(true)
        .build()
        .unwrap();
    assert_eq!(
        platform.render(&graph, node, Some(&settings)).unwrap(),
        "java.lang.IllegalStateException: bad\n\
         \tat long com.example.Worker.compute(int, java.lang.String[]) (app/Worker.java:30)\n\
         \tat void com.example.Worker.run() (app/Worker.java:12)\n\
         \tat java.lang.Thread.run (java.base@17/Thread.java:833)\n"
    );
}

#[test]
fn custom_tab() {
    let mut graph = ExceptionGraph::new();
    let node = graph.add(
        ExceptionNode::new("java.lang.Error", None).with_frames(vec![main_frame()]),
    );
    let settings = Settings::builder()
        .tab(Some(String::from("  ")))
        .build()
        .unwrap();
    assert_eq!(
        render(&graph, node, &settings),
        "java.lang.Error\n  -> Lx/Main;->main(?)?  [Main.java:3]\n"
    );
}

#[test]
fn colors_wrap_plain_output() {
    let mut graph = ExceptionGraph::new();
    let node = graph.add(
        ExceptionNode::new("java.lang.IllegalStateException", Some("boom"))
            .with_frames(vec![main_frame(), raw("x.Main", "main", "Main.java", 3)]),
    );

    let plain = Settings::default();
    let colored = plain.to_builder().color_scheme_enabled(true).build().unwrap();
    let text = render(&graph, node, &colored);

    assert!(text.starts_with("\x1b[38;5;208mjava\x1b[38;5;252m.\x1b[38;5;208mlang"));
    assert!(text.contains("\x1b[38;5;196mIllegalStateException\x1b[38;5;252m: \x1b[38;5;208mboom"));
    assert_eq!(strip_colors(&text), render(&graph, node, &plain));
}

#[test]
fn pinned_frames_replace_decoding() {
    let platform = Platform::detached();
    let mut graph = ExceptionGraph::new();
    let node = graph.add(
        ExceptionNode::new("java.lang.Error", None).with_frames(vec![main_frame()]),
    );

    let pinned = ResolvedFrame::from_raw(
        &RawFrame::new("x.Pinned", "here", Some("Pinned.java"), LineNumber::Line(1)),
        Style::Default,
    );
    platform
        .pin_frames(&mut graph, node, Some(vec![pinned.clone()]))
        .unwrap();

    let settings = Settings::default();
    assert_eq!(
        platform.render(&graph, node, Some(&settings)).unwrap(),
        "java.lang.Error\n    -> Lx/Pinned;->here(?)?  [Pinned.java:1]\n"
    );
    assert_eq!(
        platform.resolve_frames(&graph, node, Some(&settings)).unwrap(),
        vec![pinned]
    );

    platform.pin_frames(&mut graph, node, None).unwrap();
    assert!(platform
        .render(&graph, node, Some(&settings))
        .unwrap()
        .contains("Lx/Main;->main(?)?"));
}

#[test]
fn streaming_through_a_locked_sink() {
    let mut graph = ExceptionGraph::new();
    let node = graph.add(
        ExceptionNode::new("java.lang.Error", Some("streamed")).with_frames(vec![main_frame()]),
    );
    let settings = Settings::default();

    let lock = Arc::new(Mutex::new(()));
    let mut sink = WriteSink::with_lock(Vec::new(), lock.clone());
    Platform::detached()
        .render_to(&graph, node, Some(&settings), &mut sink)
        .unwrap();

    assert!(!lock.is_locked());
    assert_eq!(
        String::from_utf8(sink.into_inner()).unwrap(),
        render(&graph, node, &settings)
    );
}

#[test]
fn missing_nodes_are_rejected() {
    let mut other = ExceptionGraph::new();
    other.add(ExceptionNode::new("java.lang.Error", None));
    let foreign = other.add(ExceptionNode::new("java.lang.Error", None));

    let graph = ExceptionGraph::new();
    let platform = Platform::detached();
    assert!(matches!(
        platform.render(&graph, foreign, None),
        Err(Error::NullGraphNode)
    ));
    assert!(matches!(
        platform.resolve_frames(&graph, foreign, None),
        Err(Error::NullGraphNode)
    ));
    assert!(matches!(
        platform.describe(&graph, foreign, None),
        Err(Error::NullGraphNode)
    ));
}

#[test]
fn invalid_configuration_is_rejected_eagerly() {
    assert!(matches!(
        Settings::builder().duplicate_trace_max_size(0).build(),
        Err(Error::InvalidConfiguration(_))
    ));
}
