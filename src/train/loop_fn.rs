use std::time::Instant;

use crate::error::{Error, Result};
use crate::network::delta::ParameterDelta;
use crate::network::forward::ForwardPass;
use crate::network::network::Network;
use crate::optim::clip::clip_by_global_norm;
use crate::train::batch::Batch;
use crate::train::stats::{BatchStats, EpochStats, EvalReport};

impl Network {
    /// One step of mini-batch gradient descent over exactly `batch_size` samples.
    ///
    /// Every sample runs `fp` + `bp` in order and its gradients are captured
    /// independently. Only after the whole batch is the element-wise mean
    /// taken, clipped by global norm and applied with the current learning
    /// rate. Returns the mean training loss of the batch before the update.
    ///
    /// On error the parameters are left untouched.
    pub fn descent_batch(&mut self, inputs: &[Vec<f64>], labels: &[Vec<f64>]) -> Result<f64> {
        let batch_size = self.training_config().batch_size;
        for actual in [inputs.len(), labels.len()] {
            if actual != batch_size {
                return Err(Error::BatchSizeMismatch { expected: batch_size, actual });
            }
        }

        let mut captured: Vec<ParameterDelta> = Vec::with_capacity(batch_size);
        let mut total_loss = 0.0;
        for (i, (input, label)) in inputs.iter().zip(labels.iter()).enumerate() {
            self.fp(input, label)?;
            total_loss += self.loss();
            self.bp()?;
            captured.push(self.gradients().clone());
            self.reset_gradients();
            log::trace!("batch sample {}/{} done", i + 1, batch_size);
        }

        self.apply_batch_gradients(&captured)?;
        Ok(total_loss / batch_size as f64)
    }

    /// Averages, clips and applies per-sample gradients.
    pub(crate) fn apply_batch_gradients(&mut self, captured: &[ParameterDelta]) -> Result<()> {
        let mean = ParameterDelta::mean(captured)?;
        let threshold = self.training_config().gradient_clip_threshold;
        let clipped = clip_by_global_norm(mean, threshold);
        self.update_parameters(&clipped)
    }

    /// Trains over exactly `epoch_size` batches, evaluating on `held_out`
    /// after each one.
    ///
    /// Before batch `i` (1-based) the learning rate is recomputed from the
    /// scheduler as a pure function of `(i, epoch_size)`.
    ///
    /// With a non-zero `negative_attempt_limit` the epoch may end before all
    /// `epoch_size` batches have run; `EpochStats::batches_run` and
    /// `stopped_early` report it.
    pub fn descent_epoch(
        &mut self,
        batches: &[Batch<Vec<f64>>],
        held_out: &Batch<Vec<f64>>,
    ) -> Result<EpochStats> {
        self.run_epoch(
            batches,
            held_out,
            |network, batch| network.descent_batch(&batch.inputs, &batch.labels),
            |network, set| network.evaluate(&set.inputs, &set.labels),
        )
    }

    /// Epoch driver shared by the vector and image paths.
    pub(crate) fn run_epoch<T, Train, Eval>(
        &mut self,
        batches: &[Batch<T>],
        held_out: &Batch<T>,
        mut train: Train,
        mut eval: Eval,
    ) -> Result<EpochStats>
    where
        Train: FnMut(&mut Network, &Batch<T>) -> Result<f64>,
        Eval: FnMut(&Network, &Batch<T>) -> Result<EvalReport>,
    {
        let epoch_size = self.training_config().epoch_size;
        if batches.len() != epoch_size {
            return Err(Error::EpochSizeMismatch { expected: epoch_size, actual: batches.len() });
        }
        held_out.check_size(held_out.len())?;

        let negative_limit = self.training_config().negative_attempt_limit;
        let epoch_start = Instant::now();
        let mut best_loss = f64::INFINITY;
        let mut misses = 0usize;
        let mut stats = EpochStats {
            batches_run: 0,
            epoch_size,
            final_learning_rate: self.learning_rate(),
            held_out: EvalReport::empty(),
            best_loss: f64::INFINITY,
            stopped_early: false,
            elapsed_ms: 0,
        };

        for (index, batch) in batches.iter().enumerate() {
            let batch_number = index + 1;
            let batch_start = Instant::now();

            let learning_rate = self.training_config().learning_rate_at(batch_number);
            self.set_learning_rate(learning_rate);

            let train_loss = train(&mut *self, batch)?;
            let report = eval(&*self, held_out)?;

            if !report.is_empty() {
                if report.mean_loss < best_loss {
                    best_loss = report.mean_loss;
                    misses = 0;
                } else {
                    misses += 1;
                }
            }

            log::info!(
                "batch {}/{}  lr {:.6}  train loss {:.4}  held-out accuracy {:.2}%  loss {:.4}",
                batch_number,
                epoch_size,
                learning_rate,
                train_loss,
                report.accuracy * 100.0,
                report.mean_loss,
            );

            self.emit_progress(BatchStats {
                batch: batch_number,
                epoch_size,
                progress: batch_number as f64 / epoch_size as f64,
                learning_rate,
                train_loss,
                held_out: report,
                elapsed_ms: batch_start.elapsed().as_millis() as u64,
            });

            stats.batches_run = batch_number;
            stats.final_learning_rate = learning_rate;
            stats.held_out = report;

            if negative_limit > 0 && misses >= negative_limit {
                log::warn!(
                    "held-out loss missed its best ({:.4}) {} times in a row, stopping the epoch",
                    best_loss,
                    misses
                );
                stats.stopped_early = true;
                break;
            }
        }

        stats.best_loss = best_loss;
        stats.elapsed_ms = epoch_start.elapsed().as_millis() as u64;
        log::info!(
            "epoch done: {} batches in {:.2}s",
            stats.batches_run,
            stats.elapsed_ms as f64 / 1000.0
        );
        Ok(stats)
    }

    fn emit_progress(&mut self, stats: BatchStats) {
        if let Some(tx) = &self.progress_tx {
            if tx.send(stats).is_err() {
                log::debug!("progress receiver dropped, no further batch stats will be sent");
                self.progress_tx = None;
            }
        }
    }

    /// Forward-only pass over a sample set: no gradients, no parameter or
    /// state mutation.
    ///
    /// Returns [`EvalReport::empty`] for an empty set.
    pub fn evaluate(&self, inputs: &[Vec<f64>], labels: &[Vec<f64>]) -> Result<EvalReport> {
        if inputs.len() != labels.len() {
            return Err(Error::BatchSizeMismatch { expected: inputs.len(), actual: labels.len() });
        }
        tally(inputs.iter().zip(labels.iter()).map(|(input, label)| self.forward(input, label)))
    }
}

/// Accuracy (leftmost-argmax match) and mean loss over a stream of passes.
pub(crate) fn tally<I>(passes: I) -> Result<EvalReport>
where
    I: Iterator<Item = Result<ForwardPass>>,
{
    let mut total = 0usize;
    let mut correct = 0usize;
    let mut loss_sum = 0.0;
    for pass in passes {
        let pass = pass?;
        total += 1;
        loss_sum += pass.loss;
        if pass.is_correct() {
            correct += 1;
        }
    }
    if total == 0 {
        return Ok(EvalReport::empty());
    }
    Ok(EvalReport {
        accuracy: correct as f64 / total as f64,
        mean_loss: loss_sum / total as f64,
    })
}
