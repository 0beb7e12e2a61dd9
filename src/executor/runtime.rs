use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, info, trace, warn};

use super::command::Command;
use super::dispatcher::ActionDispatcher;
use crate::actions::ActionSequence;
use crate::config::SessionOptions;
use crate::engine::{Engine, Locator, ScriptArg};
use crate::error::{DriverError, Result};
use crate::rendezvous::{AsyncRendezvous, DialogRendezvous, wrap_async_script};

/// Largest script timeout a session accepts (2^31 - 1 ms).
const MAX_SCRIPT_TIMEOUT_MS: u64 = 2_147_483_647;

fn check_script_timeout(ms: u64) -> Result<()> {
    if ms > MAX_SCRIPT_TIMEOUT_MS {
        return Err(DriverError::InvalidInput(format!(
            "script timeout {ms}ms exceeds {MAX_SCRIPT_TIMEOUT_MS}ms"
        )));
    }
    Ok(())
}

/// One driver session.
///
/// Runtime is responsible for:
/// - routing each [`Command`] to the action dispatcher, the script runner or
///   the dialog rendezvous
/// - failing commands while a dialog needs attention
/// - tearing the session down on `quit`
pub struct Runtime {
    options: SessionOptions,
    engine: Arc<dyn Engine>,
    dialogs: Arc<DialogRendezvous>,
    dispatcher: ActionDispatcher,
    quit: bool,
}

impl Runtime {
    /// Create a session with its own dialog rendezvous, built from `options`.
    pub fn new(options: SessionOptions, engine: Arc<dyn Engine>) -> Self {
        let dialogs = Arc::new(DialogRendezvous::new(
            options.unexpected_dialog_policy,
            options.dialog_timeouts(),
        ));
        Self::with_dialogs(options, engine, dialogs)
    }

    /// Create a session around a rendezvous the engine thread already holds.
    pub fn with_dialogs(
        options: SessionOptions,
        engine: Arc<dyn Engine>,
        dialogs: Arc<DialogRendezvous>,
    ) -> Self {
        Self {
            options,
            engine,
            dialogs,
            dispatcher: ActionDispatcher::new(),
            quit: false,
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// The rendezvous to hand to the engine thread.
    pub fn dialogs(&self) -> Arc<DialogRendezvous> {
        Arc::clone(&self.dialogs)
    }

    pub fn has_quit(&self) -> bool {
        self.quit
    }

    /// Run one command and return its JSON result.
    pub fn run_command(&mut self, command: &Command) -> Result<Value> {
        if self.quit {
            return Err(DriverError::InvalidInput(format!(
                "session has quit; cannot run {}",
                command.name()
            )));
        }
        debug!(target: "pagepilot::runtime", command = command.name(), "running command");
        if !command.tolerates_open_dialog() {
            self.dialogs.check_unhandled()?;
        }

        match command {
            Command::PerformActions { actions } => self.perform_actions(actions),
            Command::ReleaseActions => self.release_actions(),
            Command::ExecuteScript { script, args } => self.execute_script(script, args),
            Command::ExecuteAsyncScript {
                script,
                args,
                timeout_ms,
            } => self.execute_async_script(script, args, *timeout_ms),
            Command::FindElement { using, value } => self.find_element(using, value),
            Command::FindElements { using, value } => self.find_elements(using, value),
            Command::GetAlertText => self.dialogs.text().map(Value::String),
            Command::AcceptAlert { text } => {
                self.dialogs.accept(text.clone())?;
                Ok(Value::Null)
            }
            Command::DismissAlert => {
                self.dialogs.dismiss()?;
                Ok(Value::Null)
            }
            Command::SendAlertText { text } => {
                self.dialogs.send_keys(text)?;
                Ok(Value::Null)
            }
            Command::SetTimeouts { script_ms } => self.set_script_timeout(*script_ms),
            Command::Quit => self.quit(),
        }
    }

    /// Decode a raw JSON command, run it, and build the reply object:
    /// `{"value": ..}` on success, `{"error": code, "message": ..}` on failure.
    pub fn handle_json(&mut self, raw: Value) -> Value {
        let result = serde_json::from_value::<Command>(raw)
            .map_err(|e| DriverError::InvalidInput(format!("malformed command: {e}")))
            .and_then(|command| self.run_command(&command));
        match result {
            Ok(value) => json!({ "value": value }),
            Err(err) => {
                warn!(target: "pagepilot::runtime", code = err.code(), error = %err, "command failed");
                json!({ "error": err.code(), "message": err.to_string() })
            }
        }
    }

    pub fn perform_actions(&mut self, sequences: &[ActionSequence]) -> Result<Value> {
        let report = self
            .dispatcher
            .compile_and_dispatch(self.engine.as_ref(), sequences)?;
        trace!(target: "pagepilot::runtime", ?report, "perform_actions done");
        Ok(Value::Null)
    }

    pub fn release_actions(&mut self) -> Result<Value> {
        self.dispatcher.release_all(self.engine.as_ref())?;
        Ok(Value::Null)
    }

    /// Inject `body` as a function and run it synchronously.
    pub fn execute_script(&mut self, body: &str, args: &[Value]) -> Result<Value> {
        let function = self
            .engine
            .inject_script(&format!("function() {{ {body} }}"))?;
        let args = args.iter().cloned().map(ScriptArg::from_json).collect();
        self.engine.run_function(&function, args)
    }

    /// Run an async script and block until it calls back, times out, the page
    /// unloads, or a dialog preempts it.
    pub fn execute_async_script(
        &mut self,
        body: &str,
        args: &[Value],
        timeout_ms: Option<u64>,
    ) -> Result<Value> {
        let timeout_ms = timeout_ms.unwrap_or(self.options.script_timeout_ms);
        check_script_timeout(timeout_ms)?;
        let function = self
            .engine
            .inject_script(&wrap_async_script(body, timeout_ms))?;

        let rendezvous = AsyncRendezvous::new(Duration::from_millis(timeout_ms));
        let mut script_args: Vec<ScriptArg> =
            args.iter().cloned().map(ScriptArg::from_json).collect();
        script_args.push(ScriptArg::Host(rendezvous.host()));

        self.dialogs.watch_async(rendezvous.host());
        let outcome = self
            .engine
            .run_function(&function, script_args)
            .map(|_| rendezvous.wait());
        self.dialogs.unwatch_async();

        let outcome = outcome?;
        debug!(target: "pagepilot::script", ?outcome, timeout_ms, "async script finished");
        outcome.into_result(timeout_ms)
    }

    pub fn find_element(&self, using: &str, value: &str) -> Result<Value> {
        let element = self.engine.find_element(&locator(using, value))?;
        Ok(element.to_json())
    }

    pub fn find_elements(&self, using: &str, value: &str) -> Result<Value> {
        let elements = self.engine.find_elements(&locator(using, value))?;
        Ok(Value::Array(elements.iter().map(|e| e.to_json()).collect()))
    }

    pub fn set_script_timeout(&mut self, script_ms: u64) -> Result<Value> {
        check_script_timeout(script_ms)?;
        self.options.script_timeout_ms = script_ms;
        Ok(Value::Null)
    }

    /// Resolve any open dialog, stop blocking new ones, and lift held input.
    pub fn quit(&mut self) -> Result<Value> {
        self.dialogs.begin_quit();
        self.quit = true;
        if let Err(err) = self.dispatcher.release_all(self.engine.as_ref()) {
            warn!(target: "pagepilot::runtime", error = %err, "failed to release input at quit");
        }
        info!(target: "pagepilot::runtime", "session quit");
        Ok(Value::Null)
    }
}

fn locator(using: &str, value: &str) -> Locator {
    Locator {
        using: using.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnexpectedDialogPolicy;
    use crate::engine::{CompiledFunction, ELEMENT_KEY, EngineCall, RecordingEngine};
    use crate::rendezvous::DialogKind;
    use std::thread;
    use std::time::Instant;

    fn options() -> SessionOptions {
        SessionOptions {
            dialog_wait_ms: 500,
            ..SessionOptions::default()
        }
    }

    fn command(value: Value) -> Command {
        serde_json::from_value(value).unwrap()
    }

    /// Engine whose script "thread" calls the host back when the script body
    /// contains `callback(<n>)`.
    fn callback_engine() -> Arc<RecordingEngine> {
        Arc::new(RecordingEngine::new().with_script_handler(Box::new(|function: &CompiledFunction, args: &[ScriptArg]| {
            let source = function.source();
            if let Some(ScriptArg::Host(host)) = args.last() {
                if let Some(start) = source.find("callback(") {
                    let rest = &source[start + "callback(".len()..];
                    let number: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
                    if let Ok(n) = number.parse::<i64>() {
                        host.complete(json!(n));
                    }
                }
            }
            Ok(Value::Null)
        })))
    }

    #[test]
    fn async_callback_returns_without_waiting_for_timeout() {
        let mut rt = Runtime::new(options(), callback_engine());
        let started = Instant::now();
        let value = rt
            .run_command(&command(json!({
                "command": "execute_async_script",
                "script": "callback(42)",
                "timeout_ms": 1000
            })))
            .unwrap();
        assert_eq!(value, json!(42));
        assert!(started.elapsed() < Duration::from_millis(1000));
    }

    #[test]
    fn async_script_without_callback_times_out() {
        let mut rt = Runtime::new(options(), callback_engine());
        let started = Instant::now();
        let err = rt
            .execute_async_script("", &[], Some(100))
            .unwrap_err();
        assert_eq!(err, DriverError::ScriptTimeout { timeout_ms: 100 });
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn async_script_uses_session_timeout() {
        let mut rt = Runtime::new(options(), callback_engine());
        rt.run_command(&command(json!({"command": "set_timeouts", "script_ms": 50})))
            .unwrap();
        assert_eq!(
            rt.execute_async_script("", &[], None),
            Err(DriverError::ScriptTimeout { timeout_ms: 50 })
        );
        assert!(rt.set_script_timeout(MAX_SCRIPT_TIMEOUT_MS + 1).is_err());
    }

    #[test]
    fn oversized_async_timeout_is_rejected_before_running() {
        let engine = callback_engine();
        let mut rt = Runtime::new(options(), engine.clone());
        let err = rt
            .run_command(&command(json!({
                "command": "execute_async_script",
                "script": "callback(1)",
                "timeout_ms": u64::MAX
            })))
            .unwrap_err();
        assert!(matches!(err, DriverError::InvalidInput(_)));
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn dismissed_dialog_is_gone() {
        let mut rt = Runtime::new(options(), Arc::new(RecordingEngine::new()));
        let dialogs = rt.dialogs();
        let engine_thread =
            thread::spawn(move || dialogs.open_dialog(DialogKind::Confirm, "Are you sure?", None));

        let text = rt
            .run_command(&command(json!({"command": "get_alert_text"})))
            .unwrap();
        assert_eq!(text, json!("Are you sure?"));
        rt.run_command(&command(json!({"command": "dismiss_alert"})))
            .unwrap();
        assert!(!engine_thread.join().unwrap().accepted());
        assert_eq!(
            rt.run_command(&command(json!({"command": "get_alert_text"}))),
            Err(DriverError::NoAlertPresent)
        );
    }

    #[test]
    fn open_dialog_blocks_other_commands() {
        let mut rt = Runtime::new(options(), Arc::new(RecordingEngine::new()));
        let dialogs = rt.dialogs();
        let engine_thread =
            thread::spawn(move || dialogs.open_dialog(DialogKind::Alert, "hello", None));
        rt.run_command(&command(json!({"command": "get_alert_text"})))
            .unwrap();

        assert_eq!(
            rt.find_element_command("#x"),
            Err(DriverError::UnhandledAlert { message: "hello".into() })
        );
        rt.run_command(&command(json!({"command": "accept_alert"})))
            .unwrap();
        engine_thread.join().unwrap();
        assert!(rt.find_element_command("#x").is_ok());
    }

    #[test]
    fn notify_policy_fails_the_next_command_once() {
        let opts = SessionOptions {
            unexpected_dialog_policy: UnexpectedDialogPolicy::DismissAndNotify,
            ..options()
        };
        let mut rt = Runtime::new(opts, Arc::new(RecordingEngine::new()));
        assert!(!rt.dialogs().open_dialog(DialogKind::Confirm, "gone", None).accepted());
        assert_eq!(
            rt.find_element_command("#x"),
            Err(DriverError::UnhandledAlert { message: "gone".into() })
        );
        assert!(rt.find_element_command("#x").is_ok());
    }

    #[test]
    fn dialog_preempts_pending_async_script() {
        let dialogs = Arc::new(DialogRendezvous::new(
            UnexpectedDialogPolicy::Accept,
            options().dialog_timeouts(),
        ));
        let page_dialogs = Arc::clone(&dialogs);
        let engine = RecordingEngine::new().with_script_handler(Box::new(move |_: &CompiledFunction, _: &[ScriptArg]| {
            page_dialogs.open_dialog(DialogKind::Alert, "interrupt", None);
            Ok(Value::Null)
        }));
        let mut rt = Runtime::with_dialogs(options(), Arc::new(engine), dialogs);
        assert_eq!(
            rt.execute_async_script("alert('interrupt')", &[], Some(5_000)),
            Err(DriverError::UnhandledAlert { message: "interrupt".into() })
        );
    }

    #[test]
    fn script_errors_propagate_and_stop_watching() {
        let engine = RecordingEngine::new().with_script_handler(Box::new(
            |_: &CompiledFunction, _: &[ScriptArg]| Err(DriverError::Javascript("boom".into())),
        ));
        let opts = SessionOptions {
            unexpected_dialog_policy: UnexpectedDialogPolicy::Accept,
            ..options()
        };
        let mut rt = Runtime::new(opts, Arc::new(engine));
        assert_eq!(
            rt.execute_async_script("throw 1", &[], Some(5_000)),
            Err(DriverError::Javascript("boom".into()))
        );
        assert!(rt.dialogs().open_dialog(DialogKind::Alert, "later", None).accepted());
        assert_eq!(rt.dialogs().check_unhandled(), Ok(()));
    }

    #[test]
    fn execute_script_passes_elements_and_returns_value() {
        let engine = Arc::new(RecordingEngine::new().with_script_handler(Box::new(
            |_: &CompiledFunction, args: &[ScriptArg]| match args.first() {
                Some(ScriptArg::Element(el)) => Ok(json!(el.id())),
                _ => Ok(Value::Null),
            },
        )));
        let mut rt = Runtime::new(options(), engine.clone());
        let element = rt.find_element("css selector", "#go").unwrap();
        let value = rt.execute_script("return arguments[0].id;", &[element]).unwrap();
        assert_eq!(value, json!("#go"));
        assert!(matches!(
            engine.calls().last(),
            Some(EngineCall::RunFunction { source }) if source.contains("return arguments[0].id;")
        ));
    }

    #[test]
    fn perform_then_release_actions() {
        let engine = Arc::new(RecordingEngine::new());
        let mut rt = Runtime::new(options(), engine.clone());
        rt.run_command(&command(json!({
            "command": "perform_actions",
            "actions": [{"type": "key", "id": "kb", "actions": [{"type": "keyDown", "value": "Shift"}]}]
        })))
        .unwrap();
        rt.run_command(&command(json!({"command": "release_actions"})))
            .unwrap();
        assert!(engine.calls().contains(&EngineCall::ReleaseKey {
            key: "\u{E008}".into()
        }));
    }

    #[test]
    fn quit_resolves_dialogs_and_ends_the_session() {
        let mut rt = Runtime::new(options(), Arc::new(RecordingEngine::new()));
        let dialogs = rt.dialogs();
        let engine_thread =
            thread::spawn(move || dialogs.open_dialog(DialogKind::Confirm, "leave?", None));
        rt.run_command(&command(json!({"command": "get_alert_text"})))
            .unwrap();
        rt.run_command(&Command::Quit).unwrap();
        assert!(engine_thread.join().unwrap().accepted());
        assert!(rt.has_quit());
        assert!(rt.run_command(&Command::ReleaseActions).is_err());
    }

    #[test]
    fn json_replies_carry_value_or_error_code() {
        let mut rt = Runtime::new(options(), Arc::new(RecordingEngine::new()));
        assert_eq!(
            rt.handle_json(json!({"command": "find_element", "using": "css selector", "value": "#a"})),
            json!({"value": {ELEMENT_KEY: "#a"}})
        );
        let reply = rt.handle_json(json!({"command": "dismiss_alert"}));
        assert_eq!(reply["error"], json!("no such alert"));
        let reply = rt.handle_json(json!({"command": "fly"}));
        assert_eq!(reply["error"], json!("invalid argument"));
    }

    impl Runtime {
        fn find_element_command(&mut self, value: &str) -> Result<Value> {
            self.run_command(&Command::FindElement {
                using: "css selector".into(),
                value: value.into(),
            })
        }
    }
}
