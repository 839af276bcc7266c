//! Off-thread execution of crypto operations.
//!
//! Every operation on [`CryptoContext`] blocks: store I/O always, and key
//! generation for seconds. A [`CryptoWorker`] owns a few threads that pull
//! jobs from a crossbeam channel and run them against one shared context.
//! Each job answers on a tokio oneshot, so the same [`Pending`] reply can be
//! awaited from async code or waited on from a plain thread.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use ctxt_types::{KeyRecord, PhoneNumber};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::context::CryptoContext;
use crate::error::{CryptoError, CryptoResult};

type Job = Box<dyn FnOnce(&CryptoContext) + Send>;

enum Message {
    Job(Job),
    Shutdown,
}

/// Reply to a job submitted through a [`WorkerHandle`].
pub struct Pending<T> {
    rx: oneshot::Receiver<CryptoResult<T>>,
}

impl<T> Pending<T> {
    pub async fn recv(self) -> CryptoResult<T> {
        self.rx.await.map_err(|_| CryptoError::WorkerGone)?
    }

    /// Block the current thread until the job finishes.
    ///
    /// Must not be called from inside an async runtime.
    pub fn wait(self) -> CryptoResult<T> {
        self.rx.blocking_recv().map_err(|_| CryptoError::WorkerGone)?
    }
}

/// Cheap, cloneable submitter for a running [`CryptoWorker`].
#[derive(Clone)]
pub struct WorkerHandle {
    tx: Sender<Message>,
}

impl WorkerHandle {
    /// Run `f` on a worker thread.
    pub fn submit<T, F>(&self, f: F) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce(&CryptoContext) -> CryptoResult<T> + Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        let job: Job = Box::new(move |ctx| {
            // The caller may have stopped listening.
            let _ = reply.send(f(ctx));
        });
        if self.tx.send(Message::Job(job)).is_err() {
            debug!("Job submitted after worker shutdown");
        }
        // A job that never ran drops its reply sender, which `recv` and
        // `wait` report as `WorkerGone`.
        Pending { rx }
    }

    pub fn encrypt(&self, plaintext: Vec<u8>, spki_der: Vec<u8>) -> Pending<Vec<u8>> {
        self.submit(move |ctx| ctx.encrypt(&plaintext, &spki_der))
    }

    pub fn decrypt(&self, ciphertext: Vec<u8>) -> Pending<Vec<u8>> {
        self.submit(move |ctx| ctx.decrypt(&ciphertext))
    }

    pub fn fetch_key(&self, number: impl Into<String>) -> Pending<Option<KeyRecord>> {
        let number = number.into();
        self.submit(move |ctx| ctx.fetch_key(&number))
    }

    pub fn new_key(&self, number: impl Into<String>, spki_der: Vec<u8>) -> Pending<KeyRecord> {
        let number = number.into();
        self.submit(move |ctx| ctx.new_key(&number, &spki_der))
    }

    pub fn share_key(&self) -> Pending<Option<KeyRecord>> {
        self.submit(|ctx| ctx.share_key())
    }

    pub fn enumerate_keys(&self) -> Pending<Vec<PhoneNumber>> {
        self.submit(|ctx| ctx.enumerate_keys())
    }

    pub fn is_key_available(&self) -> Pending<bool> {
        self.submit(|ctx| Ok(ctx.is_key_available()))
    }

    pub fn generate_key_pair(&self, owner: impl Into<String>) -> Pending<()> {
        let owner = owner.into();
        self.submit(move |ctx| ctx.generate_key_pair(&owner))
    }

    pub fn generate_key_pair_within(
        &self,
        owner: impl Into<String>,
        timeout: Duration,
    ) -> Pending<()> {
        let owner = owner.into();
        self.submit(move |ctx| ctx.generate_key_pair_within(&owner, timeout))
    }

    pub fn seal(&self, peer: impl Into<String>, plaintext: Vec<u8>) -> Pending<String> {
        let peer = peer.into();
        self.submit(move |ctx| ctx.seal(&peer, &plaintext))
    }

    pub fn open_message(&self, body: impl Into<String>) -> Pending<Vec<u8>> {
        let body = body.into();
        self.submit(move |ctx| ctx.open_message(&body))
    }

    pub fn export_share(&self) -> Pending<Option<Vec<u8>>> {
        self.submit(|ctx| ctx.export_share())
    }

    pub fn import_share(&self, payload: Vec<u8>) -> Pending<KeyRecord> {
        self.submit(move |ctx| ctx.import_share(&payload))
    }
}

pub struct CryptoWorker {
    handle: WorkerHandle,
    threads: Vec<JoinHandle<()>>,
}

impl CryptoWorker {
    /// Start `threads` workers (at least one) over `ctx`.
    pub fn spawn(ctx: CryptoContext, threads: usize) -> CryptoResult<Self> {
        let ctx = Arc::new(ctx);
        let (tx, rx) = unbounded();
        let count = threads.max(1);

        let mut handles = Vec::with_capacity(count);
        for i in 0..count {
            let ctx = ctx.clone();
            let rx = rx.clone();
            let handle = std::thread::Builder::new()
                .name(format!("ctxt-crypto-{i}"))
                .spawn(move || run(&ctx, &rx))
                .map_err(CryptoError::WorkerSpawn)?;
            handles.push(handle);
        }

        info!(threads = count, "Crypto worker started");
        Ok(Self {
            handle: WorkerHandle { tx },
            threads: handles,
        })
    }

    pub fn handle(&self) -> WorkerHandle {
        self.handle.clone()
    }

    /// Finish queued jobs, then stop and join every thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        for _ in &self.threads {
            let _ = self.handle.tx.send(Message::Shutdown);
        }
        for thread in self.threads.drain(..) {
            if thread.join().is_err() {
                warn!("Crypto worker thread panicked");
            }
        }
    }
}

impl Drop for CryptoWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(ctx: &CryptoContext, rx: &Receiver<Message>) {
    while let Ok(message) = rx.recv() {
        match message {
            Message::Job(job) => job(ctx),
            Message::Shutdown => break,
        }
    }
    debug!("Crypto worker thread exiting");
}
