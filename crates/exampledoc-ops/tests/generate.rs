#![cfg(unix)]

use std::env;
use std::fs;

use exampledoc_core::{DialectKind, DocumentFormat, Mismatch, Truncation};
use exampledoc_ops::{
    ExitCode, GenerateOptions, OperationError, Operations, PageSpec, PageStatus,
};
use exampledoc_test_support::{cwd_lock, printing_executable, ExampleProject};
use pretty_assertions::assert_eq;

fn tour_page(ops: &Operations) -> PageSpec {
    let pages = ops.select_pages(&[]).unwrap();
    PageSpec::from(pages[0])
}

#[test]
fn renders_both_passes_and_listings() {
    let _lock = cwd_lock();
    let project = ExampleProject::new();
    let ops = Operations::new(project.config());
    let page = tour_page(&ops);
    let before = env::current_dir().unwrap();

    let generated = ops.generate(&page, &GenerateOptions::default()).unwrap();

    assert_eq!(env::current_dir().unwrap(), before);
    assert_eq!(generated.passes.len(), 2);
    assert_eq!(generated.passes[0].kind, DialectKind::Compiled);
    assert_eq!(generated.passes[0].sections, 2);
    assert_eq!(
        generated.passes[0].truncation,
        Some(Truncation::SourceEndedInCode { section: 2 })
    );
    assert_eq!(generated.passes[0].mismatch, None);
    assert_eq!(generated.passes[1].kind, DialectKind::Scripted);
    assert_eq!(generated.passes[1].sections, 1);

    let doc = &generated.document;
    let expected_head = "\
Counting
========

Start from zero.

.. code-block:: C++
  
  int n = 0;
  std::cout << n << std::endl;

.. rst-class:: center

↓

.. code-block:: none
  
  0
";
    assert!(doc.starts_with(expected_head), "unexpected head:\n{doc}");
    assert!(doc.contains("  fixtures in build\n"));

    let utils = doc.find("utils.hpp\n---------").unwrap();
    let main_cpp = doc.find("main.cpp\n--------").unwrap();
    let main_sh = doc.find("main.sh\n-------").unwrap();
    assert!(utils < main_cpp && main_cpp < main_sh);
}

#[test]
fn write_then_check_reports_up_to_date() {
    let _lock = cwd_lock();
    let project = ExampleProject::new();
    let ops = Operations::new(project.config());
    let page = tour_page(&ops);
    let options = GenerateOptions::default();

    assert_eq!(ops.check_page(&page, &options).unwrap(), PageStatus::Missing);

    let generated = ops.write_page(&page, &options).unwrap();
    assert_eq!(fs::read_to_string(&project.output).unwrap(), generated.document);
    assert_eq!(ops.check_page(&page, &options).unwrap(), PageStatus::UpToDate);

    fs::write(&project.output, "hand edited\n").unwrap();
    match ops.check_page(&page, &options).unwrap() {
        PageStatus::Stale { diff } => {
            assert!(diff.contains("-hand edited"));
            assert!(diff.contains("+Counting"));
        }
        other => panic!("expected stale page, got {other:?}"),
    }
}

#[test]
fn markdown_format_comes_from_page_settings() {
    let _lock = cwd_lock();
    let project = ExampleProject::new();
    project.write_config("format = \"markdown\"\n");
    let ops = Operations::new(project.config());
    let settings = ops.select_pages(&[]).unwrap()[0];

    let options = ops.options_for(Some(settings), None, false);
    assert_eq!(options.format, DocumentFormat::Markdown);
    let rst = ops.options_for(Some(settings), Some(DocumentFormat::Rst), false);
    assert_eq!(rst.format, DocumentFormat::Rst);

    let generated = ops.generate(&PageSpec::from(settings), &options).unwrap();
    assert!(generated.document.contains("```cpp\nint n = 0;"));
    assert!(generated.document.contains("## Complete file listings"));
}

#[test]
fn short_capture_is_lenient_unless_strict() {
    let _lock = cwd_lock();
    let project = ExampleProject::new();
    printing_executable(&project.root(), "build/tour", "0\n###MARKER###\n");
    let ops = Operations::new(project.config());
    let page = tour_page(&ops);

    let lenient = ops.generate(&page, &GenerateOptions::default()).unwrap();
    assert_eq!(lenient.passes[0].sections, 1);
    assert_eq!(
        lenient.passes[0].mismatch,
        Some(Mismatch::MissingOutput { section: 1 })
    );

    let strict = GenerateOptions {
        strict: true,
        ..GenerateOptions::default()
    };
    let err = ops.generate(&page, &strict).unwrap_err();
    assert!(matches!(
        err,
        OperationError::StreamMismatch {
            pass: DialectKind::Compiled,
            ..
        }
    ));
    assert_eq!(err.exit_code(), ExitCode::Stale);
}

#[test]
fn failing_example_writes_nothing() {
    let _lock = cwd_lock();
    let project = ExampleProject::new();
    exampledoc_test_support::write_executable(&project.root(), "build/tour", "exit 1\n");
    let ops = Operations::new(project.config());
    let page = tour_page(&ops);
    let before = env::current_dir().unwrap();

    let err = ops.write_page(&page, &GenerateOptions::default()).unwrap_err();

    assert_eq!(err.exit_code(), ExitCode::RunFailed);
    assert!(!project.output.exists());
    assert_eq!(env::current_dir().unwrap(), before);
}

#[test]
fn unknown_page_is_invalid_input() {
    let project = ExampleProject::new();
    let ops = Operations::new(project.config());

    let err = ops.select_pages(&["nope".to_string()]).unwrap_err();
    assert!(matches!(err, OperationError::UnknownPage { ref name } if name == "nope"));
    assert_eq!(err.exit_code(), ExitCode::InvalidInput);
    assert_eq!(ops.select_pages(&["tour".to_string()]).unwrap().len(), 1);
}

#[test]
fn parses_a_saved_capture_without_running() {
    let project = ExampleProject::new();
    let ops = Operations::new(project.config());
    let capture = exampledoc_test_support::write_file(
        &project.root(),
        "build/tour.out",
        exampledoc_test_support::TOUR_OUTPUT,
    );

    let outcome = ops
        .parse_capture(DialectKind::Compiled, &project.source, &capture)
        .unwrap();

    assert_eq!(outcome.sections.len(), 2);
    assert_eq!(outcome.sections[1].text, "Then add one.");
    assert_eq!(outcome.sections[1].output, "1");
    assert_eq!(outcome.mismatch(), None);
}
