use std::{cell::RefCell, fs, path::Path, rc::Rc};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use command_helper::{
    error::Result,
    terminal::{TerminalFactory, TerminalSink},
};

/// Writes a config file with private permissions, creating parent directories.
#[allow(dead_code)]
pub fn write_config(path: &Path, body: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, body).unwrap();
    #[cfg(unix)]
    {
        let mut permissions = fs::metadata(path).unwrap().permissions();
        permissions.set_mode(0o600);
        fs::set_permissions(path, permissions).unwrap();
    }
}

/// Everything a recording terminal observed, shared with the test body.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct TerminalLog {
    pub created: usize,
    pub shown: usize,
    pub sent: Vec<String>,
}

/// Sink that appends every call to a shared [`TerminalLog`].
#[allow(dead_code)]
pub struct RecordingSink {
    log: Rc<RefCell<TerminalLog>>,
    alive: Rc<RefCell<bool>>,
}

impl TerminalSink for RecordingSink {
    fn is_alive(&mut self) -> bool {
        *self.alive.borrow()
    }

    fn show(&mut self) -> Result<()> {
        self.log.borrow_mut().shown += 1;
        Ok(())
    }

    fn send_text(&mut self, text: &str) -> Result<()> {
        self.log.borrow_mut().sent.push(text.to_owned());
        Ok(())
    }
}

/// Factory producing [`RecordingSink`]s; `alive` lets a test kill the sink.
#[allow(dead_code)]
#[derive(Default, Clone)]
pub struct RecordingFactory {
    pub log: Rc<RefCell<TerminalLog>>,
    pub alive: Rc<RefCell<bool>>,
}

impl TerminalFactory for RecordingFactory {
    type Sink = RecordingSink;

    fn create(&mut self, _name: &str) -> Result<Self::Sink> {
        self.log.borrow_mut().created += 1;
        *self.alive.borrow_mut() = true;
        Ok(RecordingSink {
            log: Rc::clone(&self.log),
            alive: Rc::clone(&self.alive),
        })
    }
}
