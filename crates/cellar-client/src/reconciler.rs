//! The item form's state machine.
//!
//! ```text
//! Empty ──begin_hydration──▶ Hydrating ──finish_hydration──▶ Ready ◀─┐
//!                                 │                            │     │ failed
//!                                 ▼                       begin_submit│
//!                               Failed                         ▼     │
//!                                                         Submitting ─┘
//!                                                              │
//!                                                              ▼
//!                                                            Done
//! ```
//!
//! `cancel` leaves any state for `Cancelled`.
//!
//! Create mode starts in `Ready` with a blank draft. An edit form whose item
//! id does not parse starts, and stays, in `Failed`. Every asynchronous step
//! is split into a `begin_*` call that hands out a ticket, the ticket's `run`
//! (which performs the I/O without borrowing the reconciler), and a
//! `finish_*` call that applies the outcome only if no newer step has
//! superseded it.

use std::{fmt, mem, sync::Arc};

use cellar_codec::{
  SubmitPlan, ValidationError, ValidationErrors, hydrate_draft, hydration_request,
  plan_submission, token,
};
use cellar_core::{
  draft::{Draft, DrinkAction, FieldKey},
  handbook::HandbookSet,
  ids::{EntityId, ItemId},
  item::{FileAttachment, ItemSnapshot},
  locale::DisplayNameOrder,
  transport::{HttpError, Transport},
};
use tracing::{debug, info, warn};

use crate::{Error, Result};

// ─── States ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum FormState {
  /// Edit form waiting for its reference lists.
  Empty,
  Hydrating,
  /// Editable. `error` holds the last submission, validation or input
  /// failure. `rejected` lists raw inputs the draft refused, in entry order;
  /// submission is blocked until each is corrected.
  Ready {
    draft:    Draft,
    error:    Option<String>,
    rejected: Vec<(FieldKey, String)>,
  },
  Submitting { draft: Draft },
  /// Submitted; the draft has been discarded and the form can close.
  Done,
  /// Closed without submitting. Anything in flight is ignored.
  Cancelled,
  /// Terminal: the item could not be identified or loaded.
  Failed { message: String },
}

impl FormState {
  pub fn name(&self) -> &'static str {
    match self {
      Self::Empty => "empty",
      Self::Hydrating => "hydrating",
      Self::Ready { .. } => "ready",
      Self::Submitting { .. } => "submitting",
      Self::Done => "done",
      Self::Cancelled => "cancelled",
      Self::Failed { .. } => "failed",
    }
  }
}

impl FormState {
  fn ready(draft: Draft) -> Self {
    Self::Ready {
      draft,
      error: None,
      rejected: Vec::new(),
    }
  }
}

impl fmt::Display for FormState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

// ─── Tickets ─────────────────────────────────────────────────────────────────

/// An item fetch handed out by [`Reconciler::begin_hydration`].
pub struct HydrationTicket<T> {
  transport: Arc<T>,
  epoch:     u64,
  item_id:   ItemId,
}

pub struct HydrationOutcome {
  epoch:  u64,
  result: Result<ItemSnapshot>,
}

impl<T: Transport> HydrationTicket<T> {
  pub fn item_id(&self) -> ItemId { self.item_id }

  pub async fn run(self) -> HydrationOutcome {
    let result = match self.transport.request(hydration_request(self.item_id)).await {
      Ok(value) => serde_json::from_value::<ItemSnapshot>(value).map_err(Error::Snapshot),
      Err(err) => Err(err.into()),
    };
    HydrationOutcome {
      epoch: self.epoch,
      result,
    }
  }
}

/// The requests of one submit, handed out by [`Reconciler::begin_submit`].
pub struct SubmitTicket<T> {
  transport: Arc<T>,
  epoch:     u64,
  plan:      SubmitPlan,
}

pub struct SubmitOutcome {
  epoch:  u64,
  result: Result<(), HttpError>,
}

impl<T: Transport> SubmitTicket<T> {
  pub fn plan(&self) -> &SubmitPlan { &self.plan }

  /// Issue the planned requests in order, stopping at the first failure.
  pub async fn run(self) -> SubmitOutcome {
    let mut result = Ok(());
    for request in self.plan {
      let (method, path) = (request.method, request.path.clone());
      debug!(%method, %path, "submitting");
      if let Err(err) = self.transport.request(request).await {
        result = Err(err);
        break;
      }
    }
    SubmitOutcome {
      epoch: self.epoch,
      result,
    }
  }
}

// ─── Form controls ───────────────────────────────────────────────────────────

/// One varietal checkbox with its percentage input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarietalControl {
  pub id:         EntityId,
  pub label:      String,
  pub checked:    bool,
  /// Empty when unchecked.
  pub percentage: String,
}

/// One food-pairing checkbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoodControl {
  pub id:      EntityId,
  pub label:   String,
  pub checked: bool,
}

// ─── Reconciler ──────────────────────────────────────────────────────────────

pub struct Reconciler<T> {
  transport: Arc<T>,
  target:    Option<ItemId>,
  handbooks: Arc<HandbookSet>,
  order:     DisplayNameOrder,
  state:     FormState,
  epoch:     u64,
}

impl<T: Transport> Reconciler<T> {
  /// A create form, immediately `Ready` with a blank draft.
  pub fn new_create(transport: Arc<T>, handbooks: Arc<HandbookSet>) -> Self {
    Self {
      transport,
      target: None,
      handbooks,
      order: DisplayNameOrder::default(),
      state: FormState::ready(Draft::blank()),
      epoch: 0,
    }
  }

  /// An edit form for the item named by `raw_id`, as taken from a route.
  /// An id that does not parse fails the form before any fetch.
  pub fn new_edit(transport: Arc<T>, raw_id: &str) -> Self {
    let mut form = Self {
      transport,
      target: None,
      handbooks: Arc::default(),
      order: DisplayNameOrder::default(),
      state: FormState::Empty,
      epoch: 0,
    };
    form.retarget(raw_id);
    form
  }

  pub fn with_order(mut self, order: DisplayNameOrder) -> Self {
    self.order = order;
    self
  }

  pub fn state(&self) -> &FormState { &self.state }

  pub fn target(&self) -> Option<ItemId> { self.target }

  pub fn handbooks(&self) -> &HandbookSet { &self.handbooks }

  /// The draft while it exists (`Ready` or `Submitting`).
  pub fn draft(&self) -> Option<&Draft> {
    match &self.state {
      FormState::Ready { draft, .. } | FormState::Submitting { draft } => Some(draft),
      _ => None,
    }
  }

  /// Message to show: a submission or validation failure while `Ready`, or
  /// the terminal failure.
  pub fn error(&self) -> Option<&str> {
    match &self.state {
      FormState::Ready { error, .. } => error.as_deref(),
      FormState::Failed { message } => Some(message),
      _ => None,
    }
  }

  pub fn is_busy(&self) -> bool {
    matches!(self.state, FormState::Hydrating | FormState::Submitting { .. })
  }

  // ── Hydration ─────────────────────────────────────────────────────────────

  /// Point the edit form at another item. Any fetch in flight for the old
  /// target is orphaned.
  pub fn retarget(&mut self, raw_id: &str) {
    self.epoch += 1;
    match raw_id.parse::<ItemId>() {
      Ok(id) => {
        self.target = Some(id);
        self.state = FormState::Empty;
      }
      Err(err) => {
        warn!(raw_id, "edit form opened with an invalid item id");
        self.target = None;
        self.state = FormState::Failed {
          message: err.to_string(),
        };
      }
    }
  }

  /// Start loading the target item once `handbooks` are available. Only valid
  /// from `Empty`.
  pub fn begin_hydration(&mut self, handbooks: Arc<HandbookSet>) -> Result<HydrationTicket<T>> {
    let (FormState::Empty, Some(item_id)) = (&self.state, self.target) else {
      return Err(Error::NotReady(self.state.name()));
    };
    self.handbooks = handbooks;
    self.epoch += 1;
    self.state = FormState::Hydrating;
    debug!(%item_id, epoch = self.epoch, "hydrating");
    Ok(HydrationTicket {
      transport: Arc::clone(&self.transport),
      epoch: self.epoch,
      item_id,
    })
  }

  /// Apply a hydration outcome. Returns `false` when it was superseded and
  /// dropped.
  pub fn finish_hydration(&mut self, outcome: HydrationOutcome) -> bool {
    if outcome.epoch != self.epoch || self.state != FormState::Hydrating {
      warn!(epoch = outcome.epoch, current = self.epoch, "discarding stale hydration");
      return false;
    }
    self.state = match outcome.result {
      Ok(snapshot) => {
        info!(item_id = %snapshot.id, "draft hydrated");
        FormState::ready(hydrate_draft(snapshot))
      }
      Err(err) => {
        warn!(error = %err, "hydration failed");
        FormState::Failed {
          message: err.to_string(),
        }
      }
    };
    true
  }

  /// Hydrate in one step.
  pub async fn hydrate(&mut self, handbooks: Arc<HandbookSet>) -> Result<()> {
    let outcome = self.begin_hydration(handbooks)?.run().await;
    self.finish_hydration(outcome);
    match &self.state {
      FormState::Failed { message } => Err(Error::Hydration(message.clone())),
      _ => Ok(()),
    }
  }

  // ── Edits ─────────────────────────────────────────────────────────────────

  /// The editable draft. Any message from an earlier failure is replaced by
  /// the first outstanding rejected input, if there is one.
  fn draft_mut(&mut self) -> Result<&mut Draft> {
    match &mut self.state {
      FormState::Ready {
        draft,
        error,
        rejected,
      } => {
        *error = rejected_message(rejected);
        Ok(draft)
      }
      other => Err(Error::NotReady(other.name())),
    }
  }

  /// Apply raw input to the field with form name `name` (`title_ru`, `vol`,
  /// `subcategory_id`, ...). Input the draft refuses is remembered and
  /// blocks submission until a later edit to the same field is accepted.
  pub fn set_field(&mut self, name: &str, raw: &str) -> Result<()> {
    let key: FieldKey = name.parse()?;
    let (draft, error, rejected) = match &mut self.state {
      FormState::Ready {
        draft,
        error,
        rejected,
      } => (draft, error, rejected),
      other => return Err(Error::NotReady(other.name())),
    };
    rejected.retain(|(field, _)| *field != key);
    let applied = draft.set_field(key, raw);
    if applied.is_err() {
      debug!(%key, raw, "input rejected");
      rejected.push((key, raw.to_string()));
    }
    *error = rejected_message(rejected);
    Ok(applied?)
  }

  pub fn toggle_varietal(&mut self, id: EntityId, on: bool) -> Result<bool> {
    Ok(self.draft_mut()?.toggle_varietal(id, on))
  }

  pub fn set_varietal_percentage(&mut self, id: EntityId, raw: &str) -> Result<bool> {
    Ok(self.draft_mut()?.set_varietal_percentage(id, raw)?)
  }

  pub fn toggle_food(&mut self, id: EntityId, on: bool) -> Result<bool> {
    Ok(self.draft_mut()?.toggle_food(id, on))
  }

  /// Queue a replacement image, discarding any previously queued one.
  pub fn attach(&mut self, file: FileAttachment) -> Result<()> {
    self.draft_mut()?.attach(file);
    Ok(())
  }

  pub fn clear_attachment(&mut self) -> Result<()> {
    self.draft_mut()?.clear_attachment();
    Ok(())
  }

  pub fn set_drink_action(&mut self, action: DrinkAction) -> Result<()> {
    self.draft_mut()?.drink_action = action;
    Ok(())
  }

  /// Every varietal in display order with its checkbox and percentage state.
  pub fn varietal_controls(&self) -> Vec<VarietalControl> {
    let draft = self.draft();
    self
      .handbooks
      .varietals
      .iter()
      .map(|entry| {
        let percentage = draft.and_then(|d| d.varietals.get(entry.id));
        VarietalControl {
          id:         entry.id,
          label:      entry.display_name(&self.order).to_string(),
          checked:    percentage.is_some(),
          percentage: percentage.map(ToString::to_string).unwrap_or_default(),
        }
      })
      .collect()
  }

  /// Every food in display order with its checkbox state.
  pub fn food_controls(&self) -> Vec<FoodControl> {
    let draft = self.draft();
    self
      .handbooks
      .foods
      .iter()
      .map(|entry| FoodControl {
        id:      entry.id,
        label:   entry.display_name(&self.order).to_string(),
        checked: draft.is_some_and(|d| d.foods.contains(entry.id)),
      })
      .collect()
  }

  /// The selected varietals as form tokens (`"3:60"`).
  pub fn varietal_tokens(&self) -> Vec<String> {
    self.draft().map(|d| token::encode(&d.varietals)).unwrap_or_default()
  }

  // ── Submission ────────────────────────────────────────────────────────────

  /// Validate the draft and move to `Submitting`. A rejected input or a
  /// validation failure keeps the form `Ready` with the message recorded, and
  /// no request is planned.
  pub fn begin_submit(&mut self) -> Result<SubmitTicket<T>> {
    let (draft, rejected) = match mem::replace(&mut self.state, FormState::Done) {
      FormState::Ready {
        draft, rejected, ..
      } => (draft, rejected),
      other => {
        let name = other.name();
        self.state = other;
        return Err(Error::NotReady(name));
      }
    };

    let planned = if rejected.is_empty() {
      plan_submission(&draft)
    } else {
      Err(cellar_codec::Error::Invalid(ValidationErrors(
        rejected.iter().map(unparsed).collect(),
      )))
    };
    match planned {
      Ok(plan) => {
        self.state = FormState::Submitting { draft };
        self.epoch += 1;
        debug!(requests = plan.len(), "submit planned");
        Ok(SubmitTicket {
          transport: Arc::clone(&self.transport),
          epoch: self.epoch,
          plan,
        })
      }
      Err(err) => {
        debug!(error = %err, "draft failed validation");
        self.state = FormState::Ready {
          draft,
          error: Some(err.to_string()),
          rejected,
        };
        Err(err.into())
      }
    }
  }

  /// Apply a submit outcome. Success discards the draft; failure returns the
  /// untouched draft to `Ready` and reports the backend's message.
  pub fn finish_submit(&mut self, outcome: SubmitOutcome) -> Result<()> {
    if outcome.epoch != self.epoch {
      warn!(epoch = outcome.epoch, current = self.epoch, "discarding stale submit outcome");
      return Ok(());
    }
    let draft = match mem::replace(&mut self.state, FormState::Done) {
      FormState::Submitting { draft } => draft,
      other => {
        self.state = other;
        return Ok(());
      }
    };
    match outcome.result {
      Ok(()) => {
        info!(item_id = ?self.target, "item submitted");
        Ok(())
      }
      Err(err) => {
        warn!(error = %err, "submission failed");
        self.state = FormState::Ready {
          draft,
          error: Some(err.to_string()),
          rejected: Vec::new(),
        };
        Err(err.into())
      }
    }
  }

  /// Submit in one step.
  pub async fn submit(&mut self) -> Result<()> {
    let outcome = self.begin_submit()?.run().await;
    self.finish_submit(outcome)
  }

  /// Discard the draft and orphan anything in flight.
  pub fn cancel(&mut self) {
    self.epoch += 1;
    self.state = FormState::Cancelled;
  }
}

fn unparsed((field, value): &(FieldKey, String)) -> ValidationError {
  ValidationError::Unparsed {
    field: *field,
    value: value.clone(),
  }
}

fn rejected_message(rejected: &[(FieldKey, String)]) -> Option<String> {
  rejected.first().map(|entry| unparsed(entry).to_string())
}

#[cfg(test)]
mod tests;
