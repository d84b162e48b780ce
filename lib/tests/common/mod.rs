#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use trex::frame::{LineNumber, RawFrame};
use trex::jvm::*;
use trex::runtime::{ClassData, ClassLoader, ModuleClassifier, Runtime};
use trex::BackTrace;

/// Runtime backed by handle tables filled in by the test
#[derive(Default)]
pub struct TestRuntime {
    classes: HashMap<u64, Arc<ClassData>>,
    methods: HashMap<u64, (Arc<ClassData>, usize)>,
    rederived: Option<Vec<RawFrame>>,
}

impl TestRuntime {
    pub fn new() -> TestRuntime {
        TestRuntime::default()
    }

    pub fn add_class(&mut self, handle: u64, class: ClassData) -> Arc<ClassData> {
        let class = Arc::new(class);
        self.classes.insert(handle, class.clone());
        class
    }

    pub fn add_method(&mut self, handle: u64, class: &Arc<ClassData>, index: usize) {
        self.methods.insert(handle, (class.clone(), index));
    }

    /// Frames handed out when a backtrace needs its raw frames re-derived
    pub fn with_rederived_frames(mut self, frames: Vec<RawFrame>) -> TestRuntime {
        self.rederived = Some(frames);
        self
    }
}

impl Runtime for TestRuntime {
    fn class(&self, handle: u64) -> Option<Arc<ClassData>> {
        self.classes.get(&handle).cloned()
    }

    fn method(&self, handle: u64) -> Option<(Arc<ClassData>, usize)> {
        self.methods.get(&handle).cloned()
    }

    fn raw_frames(&self, _back_trace: &BackTrace, depth: usize) -> Option<Vec<RawFrame>> {
        self.rederived
            .as_ref()
            .filter(|frames| frames.len() == depth)
            .cloned()
    }
}

/// Classifies everything under `java.` as `java.base`
pub struct JavaBase;

impl ModuleClassifier for JavaBase {
    fn classify(&self, class_name: &str) -> Option<String> {
        if class_name.starts_with("java.") {
            Some(String::from("java.base"))
        } else {
            None
        }
    }
}

pub fn name(value: &str) -> UnqualifiedName {
    UnqualifiedName::from_string(String::from(value)).unwrap()
}

/// Class whose method `i` has slot `i`
pub fn class(
    class_name: &str,
    loader: ClassLoader,
    source_file: &str,
    methods: &[(&str, &str, MethodAccessFlags)],
) -> ClassData {
    let mut class = ClassData::new(BinaryName::from_dotted(class_name).unwrap(), loader);
    class.source_file = Some(String::from(source_file));
    for (slot, (method_name, descriptor, flags)) in methods.iter().enumerate() {
        class.add_method(
            name(method_name),
            MethodDescriptor::parse(descriptor).unwrap(),
            *flags,
            slot as u16,
        );
    }
    class
}

pub const WORKER: u64 = 1;
pub const THREAD: u64 = 2;
pub const WORKER_RUN: u64 = 10;
pub const WORKER_COMPUTE: u64 = 11;
pub const THREAD_RUN: u64 = 20;

/// `com.example.Worker` (`run`, `compute`) and the boot class `java.lang.Thread` (`run`)
pub fn worker_runtime() -> TestRuntime {
    let mut runtime = TestRuntime::new();
    let worker = runtime.add_class(
        WORKER,
        class(
            "com.example.Worker",
            ClassLoader::Application(Some(String::from("app"))),
            "Worker.java",
            &[
                ("run", "()V", MethodAccessFlags::PUBLIC),
                ("compute", "(I[Ljava/lang/String;)J", MethodAccessFlags::PRIVATE),
            ],
        ),
    );
    let thread = runtime.add_class(
        THREAD,
        class(
            "java.lang.Thread",
            ClassLoader::Boot,
            "Thread.java",
            &[("run", "()V", MethodAccessFlags::PUBLIC)],
        ),
    );
    runtime.add_method(WORKER_RUN, &worker, 0);
    runtime.add_method(WORKER_COMPUTE, &worker, 1);
    runtime.add_method(THREAD_RUN, &thread, 0);
    runtime
}

/// Raw frames matching [`worker_back_trace`]
pub fn worker_frames() -> Vec<RawFrame> {
    vec![
        RawFrame::new(
            "com.example.Worker",
            "compute",
            Some("Worker.java"),
            LineNumber::Line(30),
        ),
        RawFrame::new(
            "com.example.Worker",
            "run",
            Some("Worker.java"),
            LineNumber::Line(12),
        ),
        RawFrame::new("java.lang.Thread", "run", Some("Thread.java"), LineNumber::Line(833))
            .with_module("java.base", Some("17")),
    ]
}

pub fn worker_back_trace() -> BackTrace {
    BackTrace::pc_pairs(&[
        (WORKER_COMPUTE as u32, 4),
        (WORKER_RUN as u32, 17),
        (THREAD_RUN as u32, 3),
    ])
    .unwrap()
}

pub fn raw(class_name: &str, method_name: &str, file_name: &str, line: u32) -> RawFrame {
    RawFrame::new(class_name, method_name, Some(file_name), LineNumber::Line(line))
}

/// Drop color escapes
pub fn strip_colors(text: &str) -> String {
    let mut out = String::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for c in chars.by_ref() {
                if c == 'm' {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}
