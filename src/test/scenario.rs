use std::io;
use std::sync::{Arc, Mutex};

use crate::{Config, Connection, Transport};

/// In memory transport that serves a fixed input and records what is sent.
///
/// Clones share state, so a test can keep one clone while the connection
/// owns another.
#[derive(Clone)]
pub struct Scenario {
    state: Arc<Mutex<State>>,
}

struct State {
    input: Vec<u8>,
    pos: usize,
    block_size: usize,
    sends: Vec<Vec<u8>>,
    closed: bool,
}

impl Scenario {
    pub fn new(input: impl AsRef<[u8]>) -> Self {
        Scenario {
            state: Arc::new(Mutex::new(State {
                input: input.as_ref().to_vec(),
                pos: 0,
                block_size: usize::MAX,
                sends: vec![],
                closed: false,
            })),
        }
    }

    /// Never hand out more than `size` bytes per receive.
    pub fn block_size(self, size: usize) -> Self {
        self.state.lock().unwrap().block_size = size;
        self
    }

    pub fn connect(&self, host: &str) -> Connection {
        self.connect_with(host, Config::default())
    }

    pub fn connect_with(&self, host: &str, config: Config) -> Connection {
        let mut conn = Connection::with_config(host, config).unwrap();
        conn.attach(self.clone());
        conn
    }

    /// Everything sent so far.
    pub fn sent(&self) -> Vec<u8> {
        self.sends().concat()
    }

    /// Each call to send.
    pub fn sends(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().sends.clone()
    }

    /// Input not yet received.
    pub fn remaining(&self) -> Vec<u8> {
        let state = self.state.lock().unwrap();
        state.input[state.pos..].to_vec()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

impl Transport for Scenario {
    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(io::ErrorKind::NotConnected.into());
        }
        state.sends.push(data.to_vec());
        Ok(())
    }

    fn receive(&mut self, max_len: usize) -> io::Result<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        let left = state.input.len() - state.pos;
        let n = left.min(max_len).min(state.block_size);
        let from = state.pos;
        state.pos += n;
        Ok(state.input[from..from + n].to_vec())
    }

    fn receive_line(&mut self) -> io::Result<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        let rest = &state.input[state.pos..];
        let n = rest
            .iter()
            .position(|c| *c == b'\n')
            .map(|i| i + 1)
            .unwrap_or(rest.len());
        let line = rest[..n].to_vec();
        state.pos += n;
        Ok(line)
    }

    fn close(&mut self) -> io::Result<()> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}
