//! Per-slide store of presenter annotations.
//!
//! Elements are opaque JSON objects identified by their `id` field. The
//! store keeps only the current element set and its paint order, plus a
//! bounded undo/redo history of whole-slide states.

use std::collections::{HashMap, VecDeque};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::ApiError;

pub const HISTORY_LIMIT: usize = 50;

/// One edit from the drawing client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DrawingChange {
    Create {
        element: Value,
    },
    Update {
        element: Value,
    },
    Delete {
        #[serde(rename = "elementId")]
        element_id: String,
    },
    Reorder {
        order: Vec<String>,
    },
}

impl DrawingChange {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Validate a whole batch before anything is applied.
pub fn parse_changes(raw: &[Value]) -> Result<Vec<DrawingChange>, ApiError> {
    raw.iter()
        .enumerate()
        .map(|(i, value)| {
            let change: DrawingChange = serde_json::from_value(value.clone())
                .map_err(|e| ApiError::BadRequest(format!("change {i}: {e}")))?;
            if let DrawingChange::Create { element } | DrawingChange::Update { element } = &change
            {
                if element_id(element).is_none() {
                    return Err(ApiError::BadRequest(format!(
                        "change {i}: element must be an object with a string id"
                    )));
                }
            }
            Ok(change)
        })
        .collect()
}

fn element_id(element: &Value) -> Option<&str> {
    element.as_object()?.get("id")?.as_str()
}

#[derive(Debug, Clone, Default, PartialEq)]
struct SlideDrawing {
    elements: IndexMap<String, Value>,
    order: Vec<String>,
}

impl SlideDrawing {
    fn apply(&mut self, change: &DrawingChange) {
        match change {
            DrawingChange::Create { element } | DrawingChange::Update { element } => {
                let Some(id) = element_id(element) else {
                    return;
                };
                let id = id.to_string();
                if !self.order.contains(&id) {
                    self.order.push(id.clone());
                }
                self.elements.insert(id, element.clone());
            }
            DrawingChange::Delete { element_id } => {
                self.elements.shift_remove(element_id);
                self.order.retain(|id| id != element_id);
            }
            DrawingChange::Reorder { order } => {
                let mut filtered: Vec<String> = Vec::with_capacity(order.len());
                for id in order {
                    if self.elements.contains_key(id) && !filtered.contains(id) {
                        filtered.push(id.clone());
                    }
                }
                self.order = filtered;
            }
        }
    }

    fn snapshot(&self) -> Vec<Value> {
        if self.elements.is_empty() {
            return Vec::new();
        }
        let mut changes: Vec<Value> = self
            .elements
            .values()
            .map(|el| json!({ "type": "create", "element": el }))
            .collect();
        if !self.order.is_empty() {
            changes.push(json!({ "type": "reorder", "order": self.order }));
        }
        changes
    }
}

#[derive(Debug, Default)]
struct History {
    undo: VecDeque<SlideDrawing>,
    redo: Vec<SlideDrawing>,
}

#[derive(Debug, Default)]
pub struct AnnotationStore {
    slides: HashMap<usize, SlideDrawing>,
    history: HashMap<usize, History>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a validated batch as one undoable step.
    pub fn apply_changes(&mut self, slide_index: usize, changes: &[DrawingChange]) {
        if changes.is_empty() {
            return;
        }
        let current = self.slides.entry(slide_index).or_default();
        let before = current.clone();
        for change in changes {
            current.apply(change);
        }

        let history = self.history.entry(slide_index).or_default();
        history.undo.push_back(before);
        if history.undo.len() > HISTORY_LIMIT {
            history.undo.pop_front();
        }
        history.redo.clear();
    }

    /// Step back one batch. `None` when there is nothing to undo.
    pub fn undo(&mut self, slide_index: usize) -> Option<Vec<Value>> {
        let history = self.history.get_mut(&slide_index)?;
        let previous = history.undo.pop_back()?;
        let current = self.slides.entry(slide_index).or_default();
        history.redo.push(std::mem::replace(current, previous));
        Some(current.snapshot())
    }

    pub fn redo(&mut self, slide_index: usize) -> Option<Vec<Value>> {
        let history = self.history.get_mut(&slide_index)?;
        let next = history.redo.pop()?;
        let current = self.slides.entry(slide_index).or_default();
        history.undo.push_back(std::mem::replace(current, next));
        if history.undo.len() > HISTORY_LIMIT {
            history.undo.pop_front();
        }
        Some(current.snapshot())
    }

    /// Change list that rebuilds the slide's current drawing from nothing.
    pub fn snapshot(&self, slide_index: usize) -> Vec<Value> {
        self.slides
            .get(&slide_index)
            .map(SlideDrawing::snapshot)
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub fn order(&self, slide_index: usize) -> Vec<String> {
        self.slides
            .get(&slide_index)
            .map(|s| s.order.clone())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub fn element(&self, slide_index: usize, id: &str) -> Option<&Value> {
        self.slides.get(&slide_index)?.elements.get(id)
    }

    #[cfg(test)]
    pub fn element_count(&self, slide_index: usize) -> usize {
        self.slides
            .get(&slide_index)
            .map(|s| s.elements.len())
            .unwrap_or(0)
    }
}
