//! Editor session: the single owned state container of the canvas.
//!
//! Hosts feed [`CanvasEvent`]s in, read a [`Scene`] out, and drive
//! persistence either through the two-phase ticket API (for async hosts)
//! or the blocking `*_with` helpers that take a service directly.

use crate::canvas::{InteractionController, Scene};
use crate::config::AppConfig;
use crate::geometry::Size;
use crate::keybindings::{KeyAction, KeyBindings};
use crate::message::{CanvasEvent, EventOutcome, KeyEvent};
use crate::model::{ImageInfo, Label, LabelId, ProjectId, Tool};
use crate::state::{AnnotationStore, LabelDirectory, NewLabel, ToolMemory};
use crate::sync::{
    AnnotationService, LabelService, LoadTicket, RemoteAnnotation, SaveScheduler, SaveTicket,
    SyncError, SyncOutcome, SyncTracker,
};
use crate::transform::Viewport;


/// Everything one open editor needs.
#[derive(Debug)]
pub struct EditorSession {
    store: AnnotationStore,
    viewport: Viewport,
    viewport_size: Size,
    controller: InteractionController,
    labels: LabelDirectory,
    tools: ToolMemory,
    tracker: SyncTracker,
    scheduler: SaveScheduler,
    keybindings: KeyBindings,
    image: Option<ImageInfo>,
    project: Option<ProjectId>,
    /// Store revision last seen, to notice edits.
    seen_revision: u64,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(&AppConfig::default())
    }
}

impl EditorSession {
    pub fn new(config: &AppConfig) -> Self {
        let prefs = &config.preferences;
        let store = AnnotationStore::new(prefs.history_capacity);
        let seen_revision = store.revision();
        Self {
            store,
            viewport: Viewport::new(prefs.zoom_limits()),
            viewport_size: Size::new(0.0, 0.0),
            controller: InteractionController::new(prefs.interaction_config()),
            labels: LabelDirectory::with_palette(config.palette.clone()),
            tools: ToolMemory::new(prefs.default_tool),
            tracker: SyncTracker::new(),
            scheduler: prefs.scheduler(),
            keybindings: config.keybindings.clone(),
            image: None,
            project: None,
            seen_revision,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn labels(&self) -> &LabelDirectory {
        &self.labels
    }

    pub fn keybindings(&self) -> &KeyBindings {
        &self.keybindings
    }

    pub fn set_keybindings(&mut self, keybindings: KeyBindings) {
        self.keybindings = keybindings;
    }

    pub fn image(&self) -> Option<&ImageInfo> {
        self.image.as_ref()
    }

    pub fn project(&self) -> Option<&ProjectId> {
        self.project.as_ref()
    }

    pub fn set_project(&mut self, project: ProjectId) {
        self.project = Some(project);
    }

    pub fn is_saving(&self) -> bool {
        self.tracker.is_saving()
    }

    pub fn scheduler(&self) -> &SaveScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut SaveScheduler {
        &mut self.scheduler
    }

    /// Screen-space projection of the current state.
    pub fn scene(&self) -> Scene {
        Scene::build(&self.store, &self.viewport, &self.controller, &self.labels)
    }

    // ========================================================================
    // Image lifecycle
    // ========================================================================

    /// Switch to `info`. The store is cleared immediately; fill it by
    /// completing the returned ticket with the image's annotations.
    pub fn open_image(&mut self, info: ImageInfo) -> LoadTicket {
        if let Some(previous) = &self.image {
            self.tools
                .remember(previous.id.clone(), self.store.active_tool());
        }
        self.controller.reset();
        self.store.set_annotations(Vec::new());
        let tool = self.tools.tool_for(&info.id);
        self.store.set_active_tool(tool);
        self.scheduler.reset();
        let ticket = self.tracker.open_image(info.id.clone());
        log::info!(
            "📂 Opened image {} ({}x{}), tool {}",
            info.id,
            info.width,
            info.height,
            tool.name()
        );
        self.image = Some(info);
        self.refit();
        self.seen_revision = self.store.revision();
        ticket
    }

    pub fn close_image(&mut self) {
        if let Some(previous) = self.image.take() {
            self.tools.remember(previous.id, self.store.active_tool());
        }
        self.controller.reset();
        self.store.set_annotations(Vec::new());
        self.tracker.close_image();
        self.scheduler.reset();
        self.seen_revision = self.store.revision();
    }

    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<RemoteAnnotation>, SyncError>,
    ) -> Result<SyncOutcome, SyncError> {
        let outcome = self.tracker.complete_load(ticket, result, &mut self.store)?;
        if outcome == SyncOutcome::Applied {
            self.controller.reset();
            self.seen_revision = self.store.revision();
        }
        Ok(outcome)
    }

    /// Open an image and load its annotations in one blocking step.
    pub fn load_with<S: AnnotationService>(
        &mut self,
        service: &mut S,
        info: ImageInfo,
    ) -> Result<SyncOutcome, SyncError> {
        let ticket = self.open_image(info);
        let result = service.fetch_annotations(ticket.image());
        self.complete_load(ticket, result)
    }

    fn refit(&mut self) {
        if let Some(info) = &self.image {
            self.viewport.fit_to_viewport(info.size(), self.viewport_size);
        }
    }

    // ========================================================================
    // Saving
    // ========================================================================

    /// Build a save batch. `Ok(None)` means nothing needs sending.
    ///
    /// When the label directory is loaded, every annotation must reference
    /// one of its labels.
    pub fn begin_save(&mut self) -> Result<Option<SaveTicket>, SyncError> {
        if !self.labels.is_empty()
            && let Some(orphan) = self
                .store
                .annotations()
                .iter()
                .find(|a| !self.labels.contains(&a.label_id))
        {
            return Err(SyncError::UnknownLabel(orphan.label_id.clone()));
        }
        let ticket = self.tracker.begin_save(&self.store)?;
        if ticket.is_none() {
            self.scheduler.mark_saved();
        }
        Ok(ticket)
    }

    pub fn complete_save(
        &mut self,
        ticket: SaveTicket,
        result: Result<Vec<RemoteAnnotation>, SyncError>,
    ) -> Result<SyncOutcome, SyncError> {
        let edited_during_flight = self.store.revision() != ticket.revision();
        match self.tracker.complete_save(ticket, result, &mut self.store) {
            Ok(SyncOutcome::Applied) => {
                self.scheduler.mark_saved();
                if edited_during_flight {
                    self.scheduler.mark_dirty();
                }
                self.seen_revision = self.store.revision();
                log::info!("✅ Saved {} annotation(s)", self.store.len());
                Ok(SyncOutcome::Applied)
            }
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.scheduler.mark_save_failed();
                log::warn!("❌ Save failed: {}", err);
                Err(err)
            }
        }
    }

    /// Save in one blocking step.
    pub fn save_with<S: AnnotationService>(
        &mut self,
        service: &mut S,
    ) -> Result<SyncOutcome, SyncError> {
        let Some(ticket) = self.begin_save()? else {
            return Ok(SyncOutcome::Skipped);
        };
        let result = service.submit_ops(ticket.image(), ticket.ops());
        self.complete_save(ticket, result)
    }

    /// Whether the auto-save debounce says a save should start now.
    pub fn auto_save_due(&self) -> bool {
        self.tracker.active_image().is_some()
            && !self.tracker.is_saving()
            && self.scheduler.should_save()
    }

    // ========================================================================
    // Input
    // ========================================================================

    /// Route one input event. Any store change marks the session dirty.
    pub fn handle_event(&mut self, event: CanvasEvent) -> EventOutcome {
        let outcome = match event {
            CanvasEvent::Pointer(pointer) => {
                self.controller
                    .handle_pointer(&pointer, &mut self.store, &mut self.viewport)
            }
            CanvasEvent::Wheel(wheel) => self.controller.handle_wheel(&wheel, &mut self.viewport),
            CanvasEvent::Key(key) => self.handle_key(&key),
            CanvasEvent::Resize(size) => {
                self.viewport_size = size;
                self.refit();
                EventOutcome::Redraw
            }
        };
        self.note_changes();
        outcome
    }

    fn handle_key(&mut self, event: &KeyEvent) -> EventOutcome {
        match self.keybindings.action_for(event) {
            Some(action) => self.apply_action(action),
            None => EventOutcome::Ignored,
        }
    }

    /// Perform a keyboard-level action.
    pub fn apply_action(&mut self, action: KeyAction) -> EventOutcome {
        let outcome = match action {
            KeyAction::SelectTool(tool) => self.set_tool(tool),
            KeyAction::SelectLabel(index) => match self.labels.by_index(index).map(|l| l.id.clone()) {
                Some(id) => self.set_active_label(Some(id)),
                None => EventOutcome::Ignored,
            },
            KeyAction::Undo => {
                self.controller.reset();
                changed_if(self.store.undo())
            }
            KeyAction::Redo => {
                self.controller.reset();
                changed_if(self.store.redo())
            }
            KeyAction::DeleteSelection => {
                if !self.controller.is_idle() {
                    return EventOutcome::Ignored;
                }
                let removed = self.store.delete_selected();
                if removed > 0 {
                    log::info!("🗑️ Deleted {} annotation(s)", removed);
                }
                changed_if(removed > 0)
            }
            KeyAction::ClosePolygon => self.controller.close_polygon(&mut self.store, &self.viewport),
            KeyAction::Cancel => self.controller.cancel(&mut self.store),
            KeyAction::SelectAll => {
                if self.store.is_empty() {
                    EventOutcome::Ignored
                } else {
                    self.store.select_all();
                    EventOutcome::Redraw
                }
            }
        };
        self.note_changes();
        outcome
    }

    pub fn set_tool(&mut self, tool: Tool) -> EventOutcome {
        let outcome = self.controller.set_tool(tool, &mut self.store);
        if let Some(info) = &self.image {
            self.tools.remember(info.id.clone(), tool);
        }
        outcome
    }

    pub fn set_active_label(&mut self, label: Option<LabelId>) -> EventOutcome {
        if self.store.active_label() == label.as_ref() {
            return EventOutcome::Ignored;
        }
        if let Some(id) = &label {
            log::debug!("🏷️ Active label: {}", id);
        }
        self.store.set_active_label(label);
        EventOutcome::Redraw
    }

    fn note_changes(&mut self) {
        let revision = self.store.revision();
        if revision != self.seen_revision {
            self.seen_revision = revision;
            self.scheduler.mark_dirty();
        }
    }

    // ========================================================================
    // Labels
    // ========================================================================

    fn require_project(&self) -> Result<ProjectId, SyncError> {
        self.project
            .clone()
            .ok_or_else(|| SyncError::Rejected("no project selected".to_string()))
    }

    /// Fetch the project's labels. If the active label no longer resolves,
    /// the first label becomes active.
    pub fn load_labels<S: LabelService>(&mut self, service: &mut S) -> Result<usize, SyncError> {
        let project = self.require_project()?;
        let labels = service.fetch_labels(&project)?;
        let count = labels.len();
        self.labels.replace_all(labels);

        let resolved = self
            .store
            .active_label()
            .is_some_and(|id| self.labels.contains(id));
        if !resolved {
            let first = self.labels.by_index(0).map(|l| l.id.clone());
            self.store.set_active_label(first);
        }
        log::info!("🏷️ Loaded {} label(s) for project {}", count, project);
        Ok(count)
    }

    /// Create a label. Validation runs locally before anything is sent;
    /// a missing colour is taken from the palette.
    pub fn create_label<S: LabelService>(
        &mut self,
        service: &mut S,
        new: NewLabel,
    ) -> Result<Label, SyncError> {
        let project = self.require_project()?;
        let (name, color) = self.labels.prepare(&new)?;
        let label = service.create_label(&project, &name, &color)?;
        self.labels.insert(label.clone())?;
        if self.store.active_label().is_none() {
            self.store.set_active_label(Some(label.id.clone()));
        }
        log::info!("✅ Created label '{}' ({})", label.name, label.color);
        Ok(label)
    }

    pub fn update_label<S: LabelService>(
        &mut self,
        service: &mut S,
        id: &LabelId,
        name: Option<&str>,
        color: Option<&str>,
    ) -> Result<Label, SyncError> {
        let project = self.require_project()?;
        if !self.labels.contains(id) {
            return Err(SyncError::LabelNotFound(id.clone()));
        }
        let updated = service.update_label(&project, id, name, color)?;
        let label = self
            .labels
            .update(id, Some(&updated.name), Some(&updated.color))?
            .clone();
        Ok(label)
    }

    /// Delete a label. Annotations that use it keep the stale id until the
    /// user relabels them; saving is refused meanwhile.
    pub fn delete_label<S: LabelService>(
        &mut self,
        service: &mut S,
        id: &LabelId,
    ) -> Result<(), SyncError> {
        let project = self.require_project()?;
        if !self.labels.contains(id) {
            return Err(SyncError::LabelNotFound(id.clone()));
        }
        service.delete_label(&project, id)?;
        self.labels.remove(id);
        if self.store.active_label() == Some(id) {
            self.store.set_active_label(None);
        }
        log::info!("🗑️ Deleted label {}", id);
        Ok(())
    }

    /// Relabel every selected annotation as a single undo step.
    pub fn relabel_selected(&mut self, label: &LabelId) -> usize {
        let ids: Vec<_> = self
            .store
            .selected_annotations()
            .map(|a| a.id.clone())
            .collect();
        let changed = self.store.update_annotations_label(&ids, label);
        self.note_changes();
        changed
    }
}

fn changed_if(changed: bool) -> EventOutcome {
    if changed {
        EventOutcome::Changed
    } else {
        EventOutcome::Ignored
    }
}
