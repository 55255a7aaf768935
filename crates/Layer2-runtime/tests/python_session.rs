//! Python kernel integration tests
//!
//! Each test returns early when no Python interpreter is on PATH.
//!
//! `cargo test -p codepad-runtime --test python_session -- --nocapture`

use codepad_runtime::{
    ErrorKind, ExecutionSession, LoaderConfig, PythonConfig, PythonFactory, PythonVersion,
    RuntimeLoader, SessionConfig,
};
use std::sync::Arc;
use std::time::Duration;

fn python_available() -> bool {
    let found = ["python3", "python"]
        .iter()
        .any(|name| which::which(name).is_ok());
    if !found {
        println!("skipping: no Python interpreter on PATH");
    }
    found
}

fn python_session(exec_timeout: Option<Duration>) -> ExecutionSession<PythonFactory> {
    let loader = RuntimeLoader::with_config(
        PythonFactory::new(PythonConfig::default()),
        LoaderConfig::default(),
    );
    ExecutionSession::with_config(Arc::new(loader), SessionConfig { exec_timeout })
}

#[tokio::test]
async fn test_print_hello() {
    if !python_available() {
        return;
    }
    let session = python_session(None);

    let outcome = session.execute("print('hi')").await;

    assert!(outcome.error.is_none(), "unexpected error: {:?}", outcome.error);
    assert_eq!(outcome.output, "hi\n");
    session.shutdown().await;
}

#[tokio::test]
async fn test_exception_with_prior_output() {
    if !python_available() {
        return;
    }
    let session = python_session(None);

    let outcome = session
        .execute("print('before')\nraise ValueError('x')")
        .await;

    assert_eq!(outcome.output, "before\n");
    let error = outcome.error.expect("error expected");
    assert_eq!(error.kind, ErrorKind::Execution);
    assert_eq!(error.exc_type.as_deref(), Some("ValueError"));
    assert_eq!(error.message, "x");
    let traceback = error.traceback.expect("traceback expected");
    assert!(traceback.contains("<codepad>"));
    assert!(traceback.contains("ValueError: x"));
    session.shutdown().await;
}

#[tokio::test]
async fn test_raise_without_output() {
    if !python_available() {
        return;
    }
    let session = python_session(None);

    let outcome = session.execute("raise ValueError('x')").await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::Execution));
    assert!(outcome.output.is_empty());
    session.shutdown().await;
}

#[tokio::test]
async fn test_sequential_runs_are_isolated_but_share_namespace() {
    if !python_available() {
        return;
    }
    let session = python_session(None);

    let first = session.execute("x = 41\nprint('first')").await;
    let second = session.execute("print(x + 1)").await;

    assert_eq!(first.output, "first\n");
    assert_eq!(second.output, "42\n");
    assert_eq!(session.loader().stats().initializations(), 1);
    session.shutdown().await;
}

#[tokio::test]
async fn test_stdout_stderr_interleaving() {
    if !python_available() {
        return;
    }
    let session = python_session(None);

    let outcome = session
        .execute(
            "import sys\n\
             sys.stdout.write('a')\n\
             sys.stderr.write('b')\n\
             sys.stdout.write('c')\n",
        )
        .await;

    assert!(outcome.is_success());
    assert_eq!(outcome.output, "abc");
    assert_eq!(outcome.stdout(), "ac");
    assert_eq!(outcome.stderr(), "b");
    session.shutdown().await;
}

#[tokio::test]
async fn test_syntax_error_is_execution_error() {
    if !python_available() {
        return;
    }
    let session = python_session(None);

    let outcome = session.execute("def broken(:\n    pass").await;

    let error = outcome.error.expect("error expected");
    assert_eq!(error.kind, ErrorKind::Execution);
    assert_eq!(error.exc_type.as_deref(), Some("SyntaxError"));
    session.shutdown().await;
}

#[tokio::test]
async fn test_system_exit_does_not_kill_kernel() {
    if !python_available() {
        return;
    }
    let session = python_session(None);

    let outcome = session.execute("import sys\nsys.exit(3)").await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::Execution));
    assert_eq!(
        outcome.error.as_ref().and_then(|e| e.exc_type.as_deref()),
        Some("SystemExit")
    );

    let next = session.execute("print('still here')").await;
    assert_eq!(next.output, "still here\n");
    assert_eq!(session.loader().stats().initializations(), 1);
    session.shutdown().await;
}

#[tokio::test]
async fn test_input_sees_eof() {
    if !python_available() {
        return;
    }
    let session = python_session(None);

    let outcome = session.execute("input()").await;

    assert_eq!(
        outcome.error.as_ref().and_then(|e| e.exc_type.as_deref()),
        Some("EOFError")
    );
    session.shutdown().await;
}

#[tokio::test]
async fn test_hard_exit_reports_runtime_lost_and_recovers() {
    if !python_available() {
        return;
    }
    let session = python_session(None);

    let outcome = session.execute("import os\nos._exit(1)").await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::RuntimeLost));

    let next = session.execute("print('recovered')").await;
    assert_eq!(next.output, "recovered\n");
    assert_eq!(session.loader().stats().initializations(), 2);
    session.shutdown().await;
}

#[tokio::test]
async fn test_exec_timeout_restarts_kernel() {
    if !python_available() {
        return;
    }
    let session = python_session(Some(Duration::from_millis(500)));

    let outcome = session.execute("while True:\n    pass").await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::Timeout));

    let next = session.execute("print('after timeout')").await;
    assert_eq!(next.output, "after timeout\n");
    session.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_acquire_starts_one_kernel() {
    if !python_available() {
        return;
    }
    let loader = RuntimeLoader::new(PythonFactory::default());

    let handles = futures::future::join_all((0..8).map(|_| loader.acquire())).await;
    let handles: Vec<_> = handles.into_iter().map(|h| h.unwrap()).collect();

    assert!(handles.iter().all(|h| Arc::ptr_eq(h, &handles[0])));
    assert_eq!(loader.stats().initializations(), 1);
    loader.shutdown().await;
}

#[tokio::test]
async fn test_unsatisfiable_version_fails_and_retries() {
    if !python_available() {
        return;
    }
    let loader = RuntimeLoader::new(PythonFactory::new(PythonConfig {
        python_path: None,
        min_version: PythonVersion::new(99, 0, 0),
    }));

    let err = loader.acquire().await.unwrap_err();
    assert!(matches!(err, codepad_runtime::InitError::Incompatible(_)));

    // failure is not cached
    assert!(loader.acquire().await.is_err());
    assert_eq!(loader.stats().initializations(), 2);
}

/// `execute` bounded by a generous deadline so a lost result fails the test
async fn execute_within(
    session: &ExecutionSession<PythonFactory>,
    code: &str,
) -> codepad_runtime::ExecutionOutcome {
    tokio::time::timeout(Duration::from_secs(20), session.execute(code))
        .await
        .unwrap_or_else(|_| panic!("execute did not finish: {:?}", code))
}

#[tokio::test]
async fn test_exception_message_with_lone_surrogate() {
    if !python_available() {
        return;
    }
    let session = python_session(None);

    let outcome = execute_within(&session, "raise ValueError('\\udce9')").await;

    let error = outcome.error.expect("error expected");
    assert_eq!(error.kind, ErrorKind::Execution);
    assert_eq!(error.exc_type.as_deref(), Some("ValueError"));
    assert_eq!(error.message, "\u{fffd}");

    let next = execute_within(&session, "print('next')").await;
    assert_eq!(next.output, "next\n");
    session.shutdown().await;
}

#[tokio::test]
async fn test_unicode_round_trips_through_print() {
    if !python_available() {
        return;
    }
    let session = python_session(None);

    let outcome = execute_within(
        &session,
        "print('héllo \\U0001F600 日本')\nprint('a\\udce9b')\nprint('\\ud83d\\ude00')",
    )
    .await;

    assert!(outcome.is_success(), "unexpected error: {:?}", outcome.error);
    assert_eq!(
        outcome.output,
        "héllo \u{1f600} 日本\na\u{fffd}b\n\u{1f600}\n"
    );
    session.shutdown().await;
}

#[tokio::test]
async fn test_raw_fd_write_without_newline() {
    if !python_available() {
        return;
    }
    let session = python_session(None);

    let outcome = execute_within(&session, "import os\nos.write(1, b'x')").await;
    assert!(outcome.is_success(), "unexpected error: {:?}", outcome.error);
    assert_eq!(outcome.output, "x");

    // the partial line must not leak into or break the next run
    let next = execute_within(&session, "print('clean')").await;
    assert_eq!(next.output, "clean\n");
    session.shutdown().await;
}

#[tokio::test]
async fn test_original_stdout_and_invalid_utf8_bytes() {
    if !python_available() {
        return;
    }
    let session = python_session(None);

    let outcome = execute_within(
        &session,
        "import os, sys\n\
         sys.__stdout__.write('dunder\\n')\n\
         os.write(1, b'bad \\xff end\\n')\n",
    )
    .await;

    assert!(outcome.is_success(), "unexpected error: {:?}", outcome.error);
    assert_eq!(outcome.output, "dunder\nbad \u{fffd} end\n");
    session.shutdown().await;
}

#[tokio::test]
async fn test_child_process_output_is_captured() {
    if !python_available() {
        return;
    }
    let session = python_session(None);

    let outcome = execute_within(
        &session,
        "import subprocess, sys\n\
         print('parent')\n\
         subprocess.run([sys.executable, '-c', \"print('from child')\"], check=True)\n",
    )
    .await;

    assert!(outcome.is_success(), "unexpected error: {:?}", outcome.error);
    assert_eq!(outcome.output, "parent\nfrom child\n");
    session.shutdown().await;
}
