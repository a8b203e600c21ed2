//! Batched, parallel evaluation of the ionosphere models over a sampled grid.
//!
//! The grid is split into contiguous batches which are spawned on a rayon
//! [`ThreadPool`]. The coordinating thread blocks until every batch of the
//! round is back and reassembles the rows in submission order, so results
//! never depend on which worker finishes first. Each batch has a timeout,
//! counted from the moment a worker picks it up, and a bounded number of
//! retries.

use crate::config::EvaluatorConfig;
use crate::errors::{Error, ModelError, Result};
use crate::grid::SampleGrid;
use crate::models::{CorrectionModel, IonosphereModel, ProfileBatch};
use hifitime::Epoch;
use log::{debug, error, info, warn};
use nalgebra::DMatrix;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::panic::{self, AssertUnwindSafe};
use std::collections::HashSet;
use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Contiguous slice of the grid sent to one worker
#[derive(Debug, Clone)]
pub struct Batch {
    pub index: usize,
    pub offset: usize,
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
}

/// Split the grid into contiguous batches of at most `size` cells
pub fn split_batches(grid: &SampleGrid, size: usize) -> Vec<Batch> {
    let size = size.max(1);
    grid.lats()
        .chunks(size)
        .zip(grid.lons().chunks(size))
        .enumerate()
        .map(|(index, (lats, lons))| Batch {
            index,
            offset: index * size,
            lats: lats.to_vec(),
            lons: lons.to_vec(),
        })
        .collect()
}

pub fn available_parallelism() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Workers of a pool created for a round of `nbatches` batches
pub fn worker_count(nbatches: usize) -> usize {
    available_parallelism().min(nbatches).max(1)
}

/// Pool owned by a single evaluation round
pub fn build_pool(threads: usize) -> Result<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("ionolayer-worker-{i}"))
        .build()
        .map_err(|e| Error::Pool(e.to_string()))
}

enum BatchEvent<T> {
    /// A worker picked the attempt up
    Started,
    Finished(std::result::Result<T, ModelError>),
}

struct BatchMessage<T> {
    index: usize,
    attempt: u32,
    event: BatchEvent<T>,
}

/// Density and temperature fields, `[cell][sub-layer]`
#[derive(Debug, Clone, PartialEq)]
pub struct Fields {
    pub density: DMatrix<f64>,
    pub temperature: DMatrix<f64>,
}

pub struct ModelEvaluator {
    reference: Arc<dyn IonosphereModel>,
    correction: Option<Arc<dyn CorrectionModel>>,
    config: EvaluatorConfig,
}

impl ModelEvaluator {
    pub fn new(reference: Arc<dyn IonosphereModel>, config: EvaluatorConfig) -> Self {
        ModelEvaluator {
            reference,
            correction: None,
            config,
        }
    }

    pub fn with_correction(mut self, correction: Arc<dyn CorrectionModel>) -> Self {
        self.correction = Some(correction);
        self
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    pub fn has_correction(&self) -> bool {
        self.correction.is_some()
    }

    /// Evaluate the reference model at every `heights` (km) over the grid.
    ///
    /// Without a `pool`, one is built for this call with
    /// [`worker_count`] threads and dropped before returning. A lent pool is
    /// left running. NaN outputs are replaced by 0.
    pub fn evaluate(
        &self,
        grid: &SampleGrid,
        epoch: Epoch,
        heights: &[f64],
        version: u32,
        pool: Option<&ThreadPool>,
    ) -> Result<Fields> {
        self.config.validate()?;
        let batches = split_batches(grid, self.config.batch_size);
        let model = Arc::clone(&self.reference);
        let shared_heights: Arc<[f64]> = heights.into();

        let outputs = self.run_round(
            self.reference.name(),
            &batches,
            pool,
            Arc::new(move |batch: &Batch| {
                model.profiles(epoch, &shared_heights, &batch.lats, &batch.lons, version)
            }),
        )?;

        let mut density = DMatrix::zeros(grid.len(), heights.len());
        let mut temperature = DMatrix::zeros(grid.len(), heights.len());
        for (batch, ProfileBatch { density: d, temperature: t }) in batches.iter().zip(outputs) {
            place_rows(&mut density, batch, &d, self.reference.name())?;
            place_rows(&mut temperature, batch, &t, self.reference.name())?;
        }
        sanitize(&mut density);
        sanitize(&mut temperature);

        Ok(Fields {
            density,
            temperature,
        })
    }

    /// Evaluate the correction model density over the grid.
    pub fn evaluate_correction(
        &self,
        grid: &SampleGrid,
        epoch: Epoch,
        heights: &[f64],
        pool: Option<&ThreadPool>,
    ) -> Result<DMatrix<f64>> {
        self.config.validate()?;
        let correction = self.correction.as_ref().ok_or_else(|| {
            Error::Configuration("no correction model attached to the evaluator".to_string())
        })?;
        let batches = split_batches(grid, self.config.correction_batch_size);
        let model = Arc::clone(correction);
        let shared_heights: Arc<[f64]> = heights.into();

        let outputs = self.run_round(
            correction.name(),
            &batches,
            pool,
            Arc::new(move |batch: &Batch| {
                model.density(&batch.lats, &batch.lons, &shared_heights, epoch)
            }),
        )?;

        let mut density = DMatrix::zeros(grid.len(), heights.len());
        for (batch, d) in batches.iter().zip(outputs) {
            place_rows(&mut density, batch, &d, correction.name())?;
        }
        sanitize(&mut density);
        Ok(density)
    }

    /// Dispatch every batch and collect the outputs in batch order.
    fn run_round<T, F>(
        &self,
        label: &str,
        batches: &[Batch],
        pool: Option<&ThreadPool>,
        call: Arc<F>,
    ) -> Result<Vec<T>>
    where
        T: Send + 'static,
        F: Fn(&Batch) -> std::result::Result<T, ModelError> + Send + Sync + 'static,
    {
        if batches.is_empty() {
            return Ok(Vec::new());
        }

        let owned: ThreadPool;
        let pool = match pool {
            Some(pool) => pool,
            None => {
                owned = build_pool(worker_count(batches.len()))?;
                &owned
            }
        };

        info!(
            "{}: evaluating {} batches on {} workers",
            label,
            batches.len(),
            pool.current_num_threads()
        );

        let timeout = self.config.batch_timeout;
        let (tx, rx) = channel::<BatchMessage<T>>();
        let mut attempts = vec![1u32; batches.len()];
        // Armed once a worker starts the current attempt
        let mut deadlines: Vec<Option<Instant>> = vec![None; batches.len()];
        let mut outputs: Vec<Option<T>> = batches.iter().map(|_| None).collect();
        // Timed out attempts still holding a worker
        let mut stuck: HashSet<(usize, u32)> = HashSet::new();

        for batch in batches {
            dispatch(pool, batch, 1, &call, &tx, label);
        }

        let mut remaining = batches.len();
        while remaining > 0 {
            let next_deadline = deadlines
                .iter()
                .zip(&outputs)
                .filter(|(_, output)| output.is_none())
                .filter_map(|(deadline, _)| *deadline)
                .min();

            let received = match next_deadline {
                Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(BatchMessage {
                    index,
                    attempt,
                    event,
                }) => {
                    if matches!(event, BatchEvent::Finished(_)) {
                        stuck.remove(&(index, attempt));
                    }
                    if outputs[index].is_some() {
                        continue;
                    }
                    match event {
                        BatchEvent::Started => {
                            if attempt == attempts[index] {
                                deadlines[index] = Some(Instant::now() + timeout);
                            }
                        }
                        BatchEvent::Finished(Ok(output)) => {
                            outputs[index] = Some(output);
                            remaining -= 1;
                            if self.config.progress {
                                debug!(
                                    "{}: batch {} done, {}/{}",
                                    label,
                                    index,
                                    batches.len() - remaining,
                                    batches.len()
                                );
                            }
                        }
                        // A superseded attempt failing does not count
                        BatchEvent::Finished(Err(_)) if attempt != attempts[index] => {}
                        BatchEvent::Finished(Err(source)) => {
                            if attempts[index] > self.config.max_retries {
                                return Err(Error::BatchFailed {
                                    index,
                                    attempts: attempts[index],
                                    source,
                                });
                            }
                            warn!("{}: batch {} failed ({}), retrying", label, index, source);
                            attempts[index] += 1;
                            deadlines[index] = None;
                            dispatch(pool, &batches[index], attempts[index], &call, &tx, label);
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    let now = Instant::now();
                    for batch in batches {
                        let index = batch.index;
                        let expired = deadlines[index].is_some_and(|deadline| deadline <= now);
                        if outputs[index].is_some() || !expired {
                            continue;
                        }
                        stuck.insert((index, attempts[index]));
                        // With every worker stuck a resubmitted batch never starts
                        if attempts[index] > self.config.max_retries
                            || stuck.len() >= pool.current_num_threads()
                        {
                            return Err(Error::BatchTimeout {
                                index,
                                attempts: attempts[index],
                                timeout,
                            });
                        }
                        warn!("{}: batch {} timed out after {:?}, resubmitting", label, index, timeout);
                        attempts[index] += 1;
                        deadlines[index] = None;
                        dispatch(pool, batch, attempts[index], &call, &tx, label);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Error::Pool("result channel closed".to_string()));
                }
            }
        }

        info!("{}: all {} batches evaluated", label, batches.len());
        Ok(outputs.into_iter().flatten().collect())
    }
}

fn dispatch<T, F>(
    pool: &ThreadPool,
    batch: &Batch,
    attempt: u32,
    call: &Arc<F>,
    tx: &Sender<BatchMessage<T>>,
    label: &str,
) where
    T: Send + 'static,
    F: Fn(&Batch) -> std::result::Result<T, ModelError> + Send + Sync + 'static,
{
    let batch = batch.clone();
    let call = Arc::clone(call);
    let tx = tx.clone();
    let label = label.to_string();
    pool.spawn(move || {
        let index = batch.index;
        // The round may already be over, sends are allowed to fail
        let _ = tx.send(BatchMessage {
            index,
            attempt,
            event: BatchEvent::Started,
        });
        // A panic escaping a rayon job aborts the process
        let output = panic::catch_unwind(AssertUnwindSafe(|| call(&batch))).unwrap_or_else(|_| {
            error!("{}: batch {} panicked", label, index);
            Err(ModelError::new(label.as_str(), "model panicked"))
        });
        let _ = tx.send(BatchMessage {
            index,
            attempt,
            event: BatchEvent::Finished(output),
        });
    });
}

/// Copy a batch output into the full-grid matrix at the batch offset.
fn place_rows(
    target: &mut DMatrix<f64>,
    batch: &Batch,
    rows: &DMatrix<f64>,
    model: &str,
) -> Result<()> {
    let expected = (batch.lats.len(), target.ncols());
    if rows.shape() != expected {
        return Err(Error::Model(ModelError::new(
            model,
            format!(
                "batch {} returned a {:?} matrix, expected {:?}",
                batch.index,
                rows.shape(),
                expected
            ),
        )));
    }
    target
        .view_mut((batch.offset, 0), expected)
        .copy_from(rows);
    Ok(())
}

/// Replace undefined model outputs with zero
fn sanitize(field: &mut DMatrix<f64>) {
    field.apply(|x| {
        if x.is_nan() {
            *x = 0.0;
        }
    });
}
