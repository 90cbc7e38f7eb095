use crate::config::EngineConfig;
use crate::core::context::ContextWindow;
use crate::core::dictionary::CustomDictionary;
use crate::core::filter::Verdict;
use crate::core::rules::{LogitBias, RuleEngine};
use crate::core::types::{Suggestion, TokenId};
use crate::error::{Error, Result};
use crate::learning::{context_bucket, SelectionLearner};
use crate::model::{ScoringModel, Tokenizer};
use crate::{log_debug, log_info, log_warn};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

/// The rule engine together with its bias table compiled for the engine's
/// tokenizer. Swapped as one unit on reconfiguration.
pub struct ActiveRules {
    pub engine: RuleEngine,
    bias: LogitBias,
}

// The prediction engine composes the dictionary, the rules and the two
// collaborators. Tokenizer and model are borrowed; the host owns them.
pub struct PredictionEngine<'a> {
    tokenizer: &'a dyn Tokenizer,
    model: &'a dyn ScoringModel,
    dictionary: CustomDictionary,
    rules: RwLock<Arc<ActiveRules>>,
    learner: SelectionLearner,
    window: ContextWindow,
    min_model_score: Option<f32>,
}

impl<'a> PredictionEngine<'a> {
    pub fn new(
        config: &EngineConfig,
        tokenizer: &'a dyn Tokenizer,
        model: &'a dyn ScoringModel,
        dictionary: CustomDictionary,
    ) -> Result<Self> {
        config.validate()?;
        let rules = compile_rules(config, tokenizer)?;
        log_info!(
            "prediction engine ready: vocab {}, {} dictionary entries, languages [{}]",
            tokenizer.vocab_size(),
            dictionary.len(),
            rules.engine.languages().collect::<Vec<_>>().join(", ")
        );
        Ok(Self {
            tokenizer,
            model,
            dictionary,
            rules: RwLock::new(Arc::new(rules)),
            learner: SelectionLearner::new(),
            window: ContextWindow::new(config.max_sequence_length),
            min_model_score: config.min_model_score,
        })
    }

    /// Replaces the learning table, e.g. with one restored from disk.
    pub fn with_learner(mut self, learner: SelectionLearner) -> Self {
        self.learner = learner;
        self
    }

    pub fn dictionary(&self) -> &CustomDictionary {
        &self.dictionary
    }

    pub fn learner(&self) -> &SelectionLearner {
        &self.learner
    }

    pub fn rules(&self) -> Arc<ActiveRules> {
        Arc::clone(&self.rules.read())
    }

    pub fn classify(&self, input: &str) -> Verdict {
        self.rules().engine.classify(input)
    }

    /// Swaps in new language rules and filter settings. The only way rules
    /// change after construction; in-flight calls finish on the old set.
    ///
    /// The model window and score floor are fixed at construction; a config
    /// that changes either is rejected.
    pub fn reconfigure_rules(&self, config: &EngineConfig) -> Result<()> {
        config.validate()?;
        if config.max_sequence_length != self.window.window_size() {
            return Err(Error::InvalidArgument(format!(
                "max_sequence_length is fixed at {} for this engine",
                self.window.window_size()
            )));
        }
        if config.min_model_score != self.min_model_score {
            return Err(Error::InvalidArgument("min_model_score is fixed for this engine".into()));
        }
        let rules = compile_rules(config, self.tokenizer)?;
        *self.rules.write() = Arc::new(rules);
        log_info!("language rules reconfigured");
        Ok(())
    }

    /// Ranked suggestions for the current input buffer.
    ///
    /// Dictionary matches come first in priority order; model tokens fill the
    /// remaining slots by bias-adjusted score. Noise input and empty input
    /// yield no suggestions, and so does `top_n == 0`.
    pub fn get_suggestions(
        &self,
        input: &str,
        languages: &[&str],
        context: &str,
        top_n: usize,
    ) -> Result<Vec<Suggestion>> {
        let rules = self.rules();
        let active = rules.engine.resolve(languages)?;

        if top_n == 0 || input.trim().is_empty() {
            return Ok(vec![]);
        }
        if let Verdict::NoMeaning(reason) = rules.engine.classify(input) {
            log_debug!("no suggestions for {:?}: {}", input, reason);
            return Ok(vec![]);
        }

        // Keys sharing an expansion show it once, at its best rank.
        let mut seen: HashSet<String> = HashSet::new();
        let mut suggestions: Vec<Suggestion> = self
            .dictionary
            .matching_entries(input)
            .into_iter()
            .filter(|entry| seen.insert(entry.expansion.clone()))
            .take(top_n)
            .map(|entry| Suggestion::dictionary(entry.expansion, entry.priority))
            .collect();
        if suggestions.len() == top_n {
            return Ok(suggestions);
        }

        let mut logits = self.score(context, input)?;
        rules.engine.adjust_logits(&mut logits, &active, &rules.bias)?;

        let need = top_n - suggestions.len();
        let model_suggestions = self.select_tokens(&logits, need, seen, &context_bucket(context))?;
        suggestions.extend(model_suggestions);
        suggestions.truncate(top_n);
        Ok(suggestions)
    }

    /// Feedback hook: the user picked `selected` after `context`.
    pub fn record_selection(&self, context: &str, selected: &str) -> Result<()> {
        self.learner.record(context, selected)
    }

    fn score(&self, context: &str, input: &str) -> Result<Vec<f32>> {
        let ids = self.window.build(self.tokenizer, context, input)?;
        let logits = self.model.score(&ids, self.window.window_size()).map_err(|e| {
            log_warn!("scoring model failed: {}", e);
            match e {
                Error::ModelInvocation(_) => e,
                other => Error::ModelInvocation(other.to_string()),
            }
        })?;

        let vocab_size = self.tokenizer.vocab_size();
        if logits.len() != vocab_size {
            log_warn!("scoring model returned {} logits for vocab {}", logits.len(), vocab_size);
            return Err(Error::ModelInvocation(format!(
                "expected {} logits, got {}",
                vocab_size,
                logits.len()
            )));
        }
        if let Some(pos) = logits.iter().position(|l| !l.is_finite()) {
            return Err(Error::ModelInvocation(format!("non-finite logit for token {}", pos)));
        }
        Ok(logits)
    }

    /// Picks up to `need` tokens by descending adjusted score. Equal scores
    /// are ordered by recorded selection frequency, then by lower token id.
    /// Texts already in `seen` are skipped, so dictionary entries win.
    ///
    /// Only a bounded pool of the best candidates is sorted and decoded. The
    /// pool doubles when skipped texts leave it short.
    fn select_tokens(
        &self,
        logits: &[f32],
        need: usize,
        seen: HashSet<String>,
        bucket: &str,
    ) -> Result<Vec<Suggestion>> {
        let candidates: Vec<(TokenId, f32)> = logits
            .iter()
            .enumerate()
            .map(|(id, &score)| (id as TokenId, score))
            .filter(|&(id, score)| {
                !self.tokenizer.is_special(id) && self.min_model_score.map_or(true, |min| score >= min)
            })
            .collect();
        let learned = self.learner.bucket_total(bucket) > 0;

        let mut pool = (need + seen.len()).max(1) * 2;
        loop {
            let ranked = top_candidates(&candidates, pool, learned);
            let exhausted = ranked.len() == candidates.len();
            let picked = self.pick(&ranked, need, seen.clone(), bucket, learned)?;
            if picked.len() == need || exhausted {
                return Ok(picked);
            }
            pool = pool.saturating_mul(2);
        }
    }

    fn pick(
        &self,
        ranked: &[(TokenId, f32)],
        need: usize,
        mut seen: HashSet<String>,
        bucket: &str,
        learned: bool,
    ) -> Result<Vec<Suggestion>> {
        let mut picked = Vec::with_capacity(need);
        let mut start = 0;
        while start < ranked.len() && picked.len() < need {
            let score = ranked[start].1;
            let end = start
                + ranked[start..].iter().take_while(|(_, s)| s.total_cmp(&score).is_eq()).count();
            let group = &ranked[start..end];
            start = end;

            if !learned {
                // Nothing recorded for this context: ids decide, decode lazily.
                for &(id, _) in group {
                    if picked.len() == need {
                        break;
                    }
                    let text = self.decode_token(id)?;
                    if !text.is_empty() && seen.insert(text.clone()) {
                        picked.push(Suggestion::model(text, score));
                    }
                }
                continue;
            }

            let mut tied = Vec::with_capacity(group.len());
            for &(id, _) in group {
                let text = self.decode_token(id)?;
                if text.is_empty() || seen.contains(&text) {
                    continue;
                }
                let frequency = self.learner.frequency_in_bucket(bucket, &text);
                tied.push((frequency, id, text));
            }
            tied.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

            for (_, _, text) in tied {
                if picked.len() == need {
                    break;
                }
                if seen.insert(text.clone()) {
                    picked.push(Suggestion::model(text, score));
                }
            }
        }
        Ok(picked)
    }

    fn decode_token(&self, id: TokenId) -> Result<String> {
        let text = self.tokenizer.decode(&[id]).map_err(|e| {
            log_warn!("tokenizer failed to decode {}: {}", id, e);
            match e {
                Error::Tokenizer(_) => e,
                other => Error::Tokenizer(other.to_string()),
            }
        })?;
        Ok(text.trim().to_string())
    }
}

fn by_rank(a: &(TokenId, f32), b: &(TokenId, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
}

/// The best `pool` candidates, best first. With `whole_ties` the tie group
/// straddling the cut is kept complete, since recorded frequencies may
/// reorder it.
fn top_candidates(candidates: &[(TokenId, f32)], pool: usize, whole_ties: bool) -> Vec<(TokenId, f32)> {
    let mut ranked = candidates.to_vec();
    if pool > 0 && ranked.len() > pool {
        ranked.select_nth_unstable_by(pool - 1, by_rank);
        let boundary = ranked[pool - 1].1;
        let ties: Vec<(TokenId, f32)> = if whole_ties {
            ranked[pool..].iter().filter(|(_, s)| s.total_cmp(&boundary).is_eq()).copied().collect()
        } else {
            Vec::new()
        };
        ranked.truncate(pool);
        ranked.extend(ties);
    }
    ranked.sort_by(by_rank);
    ranked
}

fn compile_rules(config: &EngineConfig, tokenizer: &dyn Tokenizer) -> Result<ActiveRules> {
    let engine = RuleEngine::new(config)?;
    let bias = engine.compile(tokenizer)?;
    Ok(ActiveRules { engine, bias })
}
