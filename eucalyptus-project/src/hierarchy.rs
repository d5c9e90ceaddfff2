//! Level and entity editing inside one open scene.
//!
//! Entities stay in a flat list per level and point at their parent by id.
//! Child lists, display paths and the tree view are derived from those links
//! whenever they are needed, so the only state that can go wrong is a link,
//! and links are checked before every change.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::Local;

use crate::error::{HierarchyError, Result};
use crate::properties::{self, FieldDescriptor, Value};
use crate::scene::{Component, ComponentKind, Entity, Level, SceneDocument, SceneStore};

/// Where [`EntityHierarchy::move_entity`] puts an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentTarget {
    /// The root of the level with this index.
    Level(usize),
    /// Under this entity.
    Entity(u32),
}

/// The object a property edit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyTarget {
    Level(usize),
    Entity(u32),
    Component { entity: u32, index: usize },
}

/// Fixes applied to a scene while it was opened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Entities whose parent was missing, in another level, or themselves.
    pub dangling_parents: Vec<u32>,
    /// Entities whose parent link was cleared to break a cycle.
    pub broken_cycles: Vec<u32>,
    /// Duplicate ids and the ids they were given instead.
    pub reassigned_ids: Vec<(u32, u32)>,
    /// Entities that lost a main camera flag.
    pub demoted_main_cameras: Vec<u32>,
}

impl RepairReport {
    pub fn is_clean(&self) -> bool {
        self.dangling_parents.is_empty()
            && self.broken_cycles.is_empty()
            && self.reassigned_ids.is_empty()
            && self.demoted_main_cameras.is_empty()
    }
}

/// Derived `Scene -> Level -> Entity` view.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneTree {
    pub name: String,
    /// Levels sorted by their `order`.
    pub levels: Vec<LevelNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelNode {
    /// Index of the level in the document.
    pub index: usize,
    pub name: String,
    pub order: i32,
    pub visible: bool,
    pub enabled: bool,
    pub roots: Vec<EntityNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityNode {
    pub id: u32,
    pub name: String,
    pub active: bool,
    pub children: Vec<EntityNode>,
}

/// An open scene document and the operations that edit it.
///
/// Every successful mutation writes the whole document back through the
/// [`SceneStore`] it was opened with. A detached hierarchy only lives in
/// memory.
#[derive(Debug)]
pub struct EntityHierarchy {
    store: Option<SceneStore>,
    document: SceneDocument,
    next_entity_id: Option<u32>,
    display_paths: HashMap<u32, String>,
    repairs: RepairReport,
}

impl EntityHierarchy {
    /// Loads the scene behind `store`, repairing broken links.
    pub fn open(store: SceneStore) -> Result<Self> {
        let document = store.load()?;
        Ok(Self::build(Some(store), document))
    }

    /// Wraps a document that is not backed by a file.
    pub fn detached(document: SceneDocument) -> Self {
        Self::build(None, document)
    }

    fn build(store: Option<SceneStore>, mut document: SceneDocument) -> Self {
        let repairs = repair(&mut document);
        if !repairs.is_clean() {
            log::warn!("Scene {:?} needed repairs: {:?}", document.name, repairs);
        }
        let mut hierarchy = Self {
            store,
            next_entity_id: document.max_entity_id().checked_add(1),
            document,
            display_paths: HashMap::new(),
            repairs,
        };
        hierarchy.refresh_paths();
        hierarchy
    }

    pub fn document(&self) -> &SceneDocument {
        &self.document
    }

    pub fn into_document(self) -> SceneDocument {
        self.document
    }

    pub fn store(&self) -> Option<&SceneStore> {
        self.store.as_ref()
    }

    /// What was fixed when the document was opened.
    pub fn repairs(&self) -> &RepairReport {
        &self.repairs
    }

    /// The id the next added entity gets, or `None` once `u32::MAX` is taken.
    pub fn next_entity_id(&self) -> Option<u32> {
        self.next_entity_id
    }

    pub fn level(&self, index: usize) -> Result<&Level> {
        Ok(self
            .document
            .levels
            .get(index)
            .ok_or(HierarchyError::LevelNotFound(index))?)
    }

    fn level_mut(&mut self, index: usize) -> Result<&mut Level> {
        Ok(self
            .document
            .levels
            .get_mut(index)
            .ok_or(HierarchyError::LevelNotFound(index))?)
    }

    /// Finds a level by name, ignoring case.
    pub fn level_index(&self, name: &str) -> Option<usize> {
        self.document
            .levels
            .iter()
            .position(|l| l.name.eq_ignore_ascii_case(name))
    }

    /// Returns the index of the level holding `id`.
    pub fn level_of(&self, id: u32) -> Result<usize> {
        Ok(self
            .document
            .levels
            .iter()
            .position(|l| l.entity(id).is_some())
            .ok_or(HierarchyError::EntityNotFound(id))?)
    }

    pub fn entity(&self, id: u32) -> Result<&Entity> {
        Ok(self
            .document
            .entities()
            .find(|e| e.id == id)
            .ok_or(HierarchyError::EntityNotFound(id))?)
    }

    fn entity_mut(&mut self, id: u32) -> Result<&mut Entity> {
        Ok(self
            .document
            .levels
            .iter_mut()
            .flat_map(|l| l.entities.iter_mut())
            .find(|e| e.id == id)
            .ok_or(HierarchyError::EntityNotFound(id))?)
    }

    /// `{scene}/{level}/{ancestors...}/{name}` for an entity.
    pub fn display_path(&self, id: u32) -> Option<&str> {
        self.display_paths.get(&id).map(String::as_str)
    }

    /// Direct children of an entity, in document order.
    pub fn children(&self, id: u32) -> Result<Vec<u32>> {
        let level = self.level(self.level_of(id)?)?;
        Ok(level
            .entities
            .iter()
            .filter(|e| e.parent_id == Some(id))
            .map(|e| e.id)
            .collect())
    }

    /// Every entity below `id`, breadth first.
    pub fn descendants(&self, id: u32) -> Result<Vec<u32>> {
        let level = self.level(self.level_of(id)?)?;
        Ok(descendants_in(level, id))
    }

    /// Writes the document back if this hierarchy has a store.
    pub fn save(&self) -> Result<()> {
        if let Some(store) = &self.store {
            store.save(&self.document)?;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.refresh_paths();
        self.save()
    }

    fn refresh_paths(&mut self) {
        self.display_paths.clear();
        for level in &self.document.levels {
            let by_id: HashMap<u32, &Entity> = level.entities.iter().map(|e| (e.id, e)).collect();
            for entity in &level.entities {
                let mut names = vec![entity.display_name()];
                let mut seen = HashSet::from([entity.id]);
                let mut current = entity.parent_id;
                while let Some(parent_id) = current {
                    let Some(parent) = by_id.get(&parent_id) else {
                        break;
                    };
                    if !seen.insert(parent_id) {
                        break;
                    }
                    names.push(parent.display_name());
                    current = parent.parent_id;
                }
                names.push(level.name.clone());
                names.push(self.document.name.clone());
                names.reverse();
                self.display_paths.insert(entity.id, names.join("/"));
            }
        }
    }

    pub fn add_level(&mut self, name: Option<&str>) -> Result<usize> {
        let name = match name {
            Some(name) => validate_name(name)?,
            None => format!("Level_{}", Local::now().format("%Y%m%d_%H%M%S")),
        };
        let order = self.document.levels.len() as i32;
        self.document.levels.push(Level::new(name, order));
        let index = self.document.levels.len() - 1;
        self.commit()?;
        log::debug!("Added level {} to {:?}", index, self.document.name);
        Ok(index)
    }

    /// Removes a level together with its entities.
    pub fn delete_level(&mut self, index: usize) -> Result<Level> {
        self.level(index)?;
        let level = self.document.levels.remove(index);
        self.commit()?;
        log::debug!(
            "Deleted level {:?} with {} entities",
            level.name,
            level.entities.len()
        );
        Ok(level)
    }

    pub fn rename_level(&mut self, index: usize, name: &str) -> Result<()> {
        let name = validate_name(name)?;
        self.level_mut(index)?.name = name;
        self.commit()
    }

    pub fn set_level_visible(&mut self, index: usize, visible: bool) -> Result<()> {
        self.level_mut(index)?.visible = visible;
        self.commit()
    }

    pub fn set_level_enabled(&mut self, index: usize, enabled: bool) -> Result<()> {
        self.level_mut(index)?.enabled = enabled;
        self.commit()
    }

    /// Adds an entity to a level, optionally under a parent from the same
    /// level. Returns the new id.
    pub fn add_entity(&mut self, level: usize, parent: Option<u32>, name: Option<&str>) -> Result<u32> {
        let name = name.map(validate_name).transpose()?;
        let target = self.level(level)?;
        if let Some(parent) = parent
            && target.entity(parent).is_none()
        {
            return Err(HierarchyError::EntityNotFound(parent).into());
        }

        let id = self.next_entity_id.ok_or(HierarchyError::IdsExhausted)?;
        self.next_entity_id = id.checked_add(1);
        let mut entity = Entity::new(id, name);
        entity.parent_id = parent;
        self.level_mut(level)?.entities.push(entity);
        self.commit()?;
        log::debug!("Added entity {} to level {}", id, level);
        Ok(id)
    }

    /// Deletes an entity and everything below it. Returns the removed
    /// entities in document order.
    pub fn delete_entity(&mut self, id: u32) -> Result<Vec<Entity>> {
        let level_index = self.level_of(id)?;
        let level = self.level_mut(level_index)?;
        let mut doomed: HashSet<u32> = descendants_in(level, id).into_iter().collect();
        doomed.insert(id);

        let (removed, kept): (Vec<_>, Vec<_>) = level
            .entities
            .drain(..)
            .partition(|e| doomed.contains(&e.id));
        level.entities = kept;

        self.commit()?;
        log::debug!("Deleted entity {} ({} in total)", id, removed.len());
        Ok(removed)
    }

    /// Re-parents an entity.
    ///
    /// Moving into another level takes the entity's whole subtree along, so
    /// parent links never cross levels.
    pub fn move_entity(&mut self, id: u32, target: ParentTarget) -> Result<()> {
        let source_level = self.level_of(id)?;
        let (target_level, new_parent) = match target {
            ParentTarget::Entity(parent) => {
                if parent == id {
                    return Err(HierarchyError::CyclicMove { entity: id, target: parent }.into());
                }
                let target_level = self.level_of(parent)?;
                if target_level == source_level && self.descendants(id)?.contains(&parent) {
                    return Err(HierarchyError::CyclicMove { entity: id, target: parent }.into());
                }
                (target_level, Some(parent))
            }
            ParentTarget::Level(index) => {
                self.level(index)?;
                (index, None)
            }
        };

        if target_level == source_level {
            let entity = self.entity_mut(id)?;
            if entity.parent_id == new_parent {
                return Ok(());
            }
            entity.parent_id = new_parent;
        } else {
            let level = self.level_mut(source_level)?;
            let mut subtree: HashSet<u32> = descendants_in(level, id).into_iter().collect();
            subtree.insert(id);
            let (mut moved, kept): (Vec<_>, Vec<_>) = level
                .entities
                .drain(..)
                .partition(|e| subtree.contains(&e.id));
            level.entities = kept;
            if let Some(root) = moved.iter_mut().find(|e| e.id == id) {
                root.parent_id = new_parent;
            }
            self.level_mut(target_level)?.entities.extend(moved);
        }

        self.commit()?;
        log::debug!("Moved entity {} to {:?}", id, target);
        Ok(())
    }

    pub fn rename_entity(&mut self, id: u32, name: &str) -> Result<()> {
        let name = validate_name(name)?;
        self.entity_mut(id)?.name = name;
        self.commit()
    }

    /// Attaches a component, returning its index.
    ///
    /// A camera flagged as main becomes the only main camera of the scene.
    pub fn add_component(&mut self, id: u32, mut component: Component) -> Result<usize> {
        if component.kind == ComponentKind::Model {
            match component.model_id {
                Some(model) if model > 0 => {}
                other => return Err(HierarchyError::InvalidModel(other.unwrap_or(0)).into()),
            }
        }
        let make_main = component.is_main_camera && component.kind == ComponentKind::Camera;
        component.is_main_camera = false;

        let entity = self.entity_mut(id)?;
        entity.components.push(component);
        let index = entity.components.len() - 1;
        if make_main {
            self.flag_main_camera(id, index);
        }
        self.commit()?;
        Ok(index)
    }

    pub fn remove_component(&mut self, id: u32, index: usize) -> Result<Component> {
        let entity = self.entity_mut(id)?;
        if index >= entity.components.len() {
            return Err(HierarchyError::ComponentNotFound { entity: id, index }.into());
        }
        let component = entity.components.remove(index);
        self.commit()?;
        Ok(component)
    }

    /// Gives an entity a model component pointing at resource `model_id`.
    pub fn attach_model(&mut self, id: u32, model_id: u32) -> Result<usize> {
        self.add_component(id, Component::model(model_id))
    }

    /// Removes the first model component pointing at `model_id`.
    pub fn detach_model(&mut self, id: u32, model_id: u32) -> Result<Component> {
        let index = self
            .entity(id)?
            .components
            .iter()
            .position(|c| c.kind == ComponentKind::Model && c.model_id == Some(model_id))
            .ok_or(HierarchyError::ModelNotAttached {
                entity: id,
                model: model_id,
            })?;
        self.remove_component(id, index)
    }

    /// Makes a camera component the main camera, clearing the flag on every
    /// other camera in the scene.
    pub fn set_main_camera(&mut self, id: u32, index: usize) -> Result<()> {
        let component = self
            .entity(id)?
            .components
            .get(index)
            .ok_or(HierarchyError::ComponentNotFound { entity: id, index })?;
        if component.kind != ComponentKind::Camera {
            return Err(HierarchyError::NotACamera { entity: id, index }.into());
        }
        self.flag_main_camera(id, index);
        self.commit()?;
        log::debug!("Entity {} now holds the main camera", id);
        Ok(())
    }

    fn flag_main_camera(&mut self, id: u32, index: usize) {
        for level in &mut self.document.levels {
            for entity in &mut level.entities {
                for (i, component) in entity.components.iter_mut().enumerate() {
                    component.is_main_camera = entity.id == id && i == index;
                }
            }
        }
    }

    /// The entity and component index of the main camera, if any.
    pub fn main_camera(&self) -> Option<(u32, usize)> {
        self.document.entities().find_map(|e| {
            e.components
                .iter()
                .position(|c| c.is_main_camera)
                .map(|index| (e.id, index))
        })
    }

    /// The fields of a target in display order.
    pub fn fields(&self, target: PropertyTarget) -> Result<Vec<&'static FieldDescriptor>> {
        Ok(match target {
            PropertyTarget::Level(index) => properties::sorted_fields(self.level(index)?),
            PropertyTarget::Entity(id) => properties::sorted_fields(self.entity(id)?),
            PropertyTarget::Component { entity, index } => {
                properties::sorted_fields(self.component(entity, index)?)
            }
        })
    }

    pub fn get_property(&self, target: PropertyTarget, field: &str) -> Result<Value> {
        Ok(match target {
            PropertyTarget::Level(index) => properties::read(self.level(index)?, field)?,
            PropertyTarget::Entity(id) => properties::read(self.entity(id)?, field)?,
            PropertyTarget::Component { entity, index } => {
                properties::read(self.component(entity, index)?, field)?
            }
        })
    }

    /// Edits a field from text. Names and the main camera flag go through the
    /// same rules as the dedicated operations.
    pub fn set_property(&mut self, target: PropertyTarget, field: &str, text: &str) -> Result<Value> {
        let value = match target {
            PropertyTarget::Level(index) => {
                let level = self.level_mut(index)?;
                if properties::descriptor(&*level, field)?.name == "name" {
                    let name = validate_name(text)?;
                    level.name = name.clone();
                    Value::String(name)
                } else {
                    properties::write(level, field, text)?
                }
            }
            PropertyTarget::Entity(id) => {
                let entity = self.entity_mut(id)?;
                if properties::descriptor(&*entity, field)?.name == "name" {
                    let name = validate_name(text)?;
                    entity.name = name.clone();
                    Value::String(name)
                } else {
                    properties::write(entity, field, text)?
                }
            }
            PropertyTarget::Component { entity, index } => {
                let component = self.component(entity, index)?;
                let descriptor = properties::descriptor(component, field)?;
                let parsed = properties::parse_value(text, descriptor.value_type)?;
                match (descriptor.name, &parsed) {
                    ("isMainCamera", Value::Bool(true)) => {
                        self.set_main_camera(entity, index)?;
                        return Ok(parsed);
                    }
                    ("modelID", Value::Int(0)) => {
                        return Err(HierarchyError::InvalidModel(0).into());
                    }
                    _ => {}
                }
                let component = self.component_mut(entity, index)?;
                properties::write(component, field, text)?
            }
        };
        self.commit()?;
        log::debug!("Set {} on {:?} to {}", field, target, value);
        Ok(value)
    }

    fn component(&self, id: u32, index: usize) -> Result<&Component> {
        Ok(self
            .entity(id)?
            .components
            .get(index)
            .ok_or(HierarchyError::ComponentNotFound { entity: id, index })?)
    }

    fn component_mut(&mut self, id: u32, index: usize) -> Result<&mut Component> {
        Ok(self
            .entity_mut(id)?
            .components
            .get_mut(index)
            .ok_or(HierarchyError::ComponentNotFound { entity: id, index })?)
    }

    /// Builds the tree view of the scene.
    pub fn tree(&self) -> SceneTree {
        let mut levels: Vec<LevelNode> = self
            .document
            .levels
            .iter()
            .enumerate()
            .map(|(index, level)| {
                let mut children: HashMap<Option<u32>, Vec<&Entity>> = HashMap::new();
                for entity in &level.entities {
                    children.entry(entity.parent_id).or_default().push(entity);
                }
                let mut visited = HashSet::new();
                LevelNode {
                    index,
                    name: level.name.clone(),
                    order: level.order,
                    visible: level.visible,
                    enabled: level.enabled,
                    roots: entity_nodes(&children, None, &mut visited),
                }
            })
            .collect();
        levels.sort_by_key(|l| (l.order, l.index));
        SceneTree {
            name: self.document.name.clone(),
            levels,
        }
    }
}

fn entity_nodes(
    children: &HashMap<Option<u32>, Vec<&Entity>>,
    parent: Option<u32>,
    visited: &mut HashSet<u32>,
) -> Vec<EntityNode> {
    let Some(entities) = children.get(&parent) else {
        return Vec::new();
    };
    let mut nodes = Vec::with_capacity(entities.len());
    for entity in entities {
        if !visited.insert(entity.id) {
            continue;
        }
        nodes.push(EntityNode {
            id: entity.id,
            name: entity.display_name(),
            active: entity.active,
            children: entity_nodes(children, Some(entity.id), visited),
        });
    }
    nodes
}

fn validate_name(name: &str) -> std::result::Result<String, HierarchyError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(HierarchyError::InvalidName(name.to_string()));
    }
    Ok(trimmed.to_string())
}

fn descendants_in(level: &Level, id: u32) -> Vec<u32> {
    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    for entity in &level.entities {
        if let Some(parent) = entity.parent_id {
            children.entry(parent).or_default().push(entity.id);
        }
    }

    let mut found = Vec::new();
    let mut seen = HashSet::from([id]);
    let mut queue = VecDeque::from([id]);
    while let Some(current) = queue.pop_front() {
        for &child in children.get(&current).into_iter().flatten() {
            if seen.insert(child) {
                found.push(child);
                queue.push_back(child);
            }
        }
    }
    found
}

/// The first id at or after `from` that is not in `used`, wrapping past
/// `u32::MAX` back to 1.
fn unused_id(used: &HashSet<u32>, from: u32) -> Option<u32> {
    (from..=u32::MAX)
        .chain(1..from)
        .find(|id| !used.contains(id))
}

/// Fixes what a hand edited or older scene file can get wrong: duplicate ids,
/// parents that are missing or in another level, parent cycles and more than
/// one main camera.
fn repair(document: &mut SceneDocument) -> RepairReport {
    let mut report = RepairReport::default();

    let mut used: HashSet<u32> = document.entities().map(|e| e.id).collect();
    let mut seen = HashSet::new();
    let mut from = document.max_entity_id().checked_add(1).unwrap_or(1);
    for entity in document.levels.iter_mut().flat_map(|l| l.entities.iter_mut()) {
        if seen.insert(entity.id) {
            continue;
        }
        let Some(fresh) = unused_id(&used, from) else {
            log::error!("No free entity id left for duplicate {}", entity.id);
            break;
        };
        log::warn!("Duplicate entity id {}, reassigned to {}", entity.id, fresh);
        report.reassigned_ids.push((entity.id, fresh));
        entity.id = fresh;
        used.insert(fresh);
        seen.insert(fresh);
        from = fresh.checked_add(1).unwrap_or(1);
    }

    for level in &mut document.levels {
        let ids: HashSet<u32> = level.entities.iter().map(|e| e.id).collect();
        for entity in &mut level.entities {
            if let Some(parent) = entity.parent_id
                && (parent == entity.id || !ids.contains(&parent))
            {
                log::warn!(
                    "Entity {} points at missing parent {}, moved to the level root",
                    entity.id,
                    parent
                );
                entity.parent_id = None;
                report.dangling_parents.push(entity.id);
            }
        }
        report.broken_cycles.extend(break_cycles(level));
    }

    let mut has_main = false;
    for entity in document.levels.iter_mut().flat_map(|l| l.entities.iter_mut()) {
        for component in &mut entity.components {
            if !component.is_main_camera {
                continue;
            }
            if has_main || component.kind != ComponentKind::Camera {
                log::warn!("Cleared extra main camera flag on entity {}", entity.id);
                component.is_main_camera = false;
                report.demoted_main_cameras.push(entity.id);
            } else {
                has_main = true;
            }
        }
    }

    report
}

fn break_cycles(level: &mut Level) -> Vec<u32> {
    let mut broken = Vec::new();
    for start in 0..level.entities.len() {
        let mut path = HashSet::new();
        let mut current = level.entities[start].id;
        loop {
            if !path.insert(current) {
                if let Some(entity) = level.entity_mut(current) {
                    entity.parent_id = None;
                }
                log::warn!("Broke parent cycle at entity {}", current);
                broken.push(current);
                break;
            }
            match level.entity(current).and_then(|e| e.parent_id) {
                Some(parent) => current = parent,
                None => break,
            }
        }
    }
    broken
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn scene() -> EntityHierarchy {
        EntityHierarchy::detached(SceneDocument::new("Main"))
    }

    /// Default level with A -> B -> C and a separate root D.
    fn chain() -> (EntityHierarchy, [u32; 4]) {
        let mut h = scene();
        let a = h.add_entity(0, None, Some("A")).unwrap();
        let b = h.add_entity(0, Some(a), Some("B")).unwrap();
        let c = h.add_entity(0, Some(b), Some("C")).unwrap();
        let d = h.add_entity(0, None, Some("D")).unwrap();
        (h, [a, b, c, d])
    }

    #[test]
    fn ids_start_at_one_and_increase() {
        let (h, ids) = chain();
        assert_eq!(ids, [1, 2, 3, 4]);
        assert_eq!(h.next_entity_id(), Some(5));
        assert_eq!(h.entity(3).unwrap().transform.scale, glam::Vec3::ONE);
    }

    #[test]
    fn new_entities_get_a_default_name() {
        let mut h = scene();
        let id = h.add_entity(0, None, None).unwrap();
        assert_eq!(h.entity(id).unwrap().name, "Entity_1");
    }

    #[test]
    fn adding_under_a_missing_parent_fails() {
        let (mut h, [a, ..]) = chain();
        h.delete_entity(a).unwrap();
        let err = h.add_entity(0, Some(a), None).unwrap_err();
        assert!(matches!(err, Error::Hierarchy(HierarchyError::EntityNotFound(id)) if id == a));
        assert!(h.add_entity(3, None, None).unwrap_err().is_not_found());
    }

    #[test]
    fn adding_under_a_parent_in_another_level_fails() {
        let (mut h, [a, ..]) = chain();
        let level = h.add_level(Some("Second")).unwrap();
        assert!(h.add_entity(level, Some(a), None).unwrap_err().is_not_found());
    }

    #[test]
    fn deleting_removes_the_whole_subtree() {
        let (mut h, [a, b, c, d]) = chain();
        let removed = h.delete_entity(a).unwrap();
        let removed: Vec<u32> = removed.iter().map(|e| e.id).collect();
        assert_eq!(removed, vec![a, b, c]);
        assert!(h.entity(d).is_ok());
        assert!(h.display_path(c).is_none());
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let (mut h, [.., d]) = chain();
        h.delete_entity(d).unwrap();
        assert_eq!(h.add_entity(0, None, None).unwrap(), 5);
    }

    #[test]
    fn display_paths_follow_the_parent_chain() {
        let (mut h, [a, b, c, _]) = chain();
        assert_eq!(h.display_path(c), Some("Main/Default/A/B/C"));
        h.rename_entity(b, "Middle").unwrap();
        assert_eq!(h.display_path(c), Some("Main/Default/A/Middle/C"));
        h.move_entity(c, ParentTarget::Level(0)).unwrap();
        assert_eq!(h.display_path(c), Some("Main/Default/C"));
        assert_eq!(h.display_path(a), Some("Main/Default/A"));
    }

    #[test]
    fn moving_under_a_descendant_is_cyclic() {
        let (mut h, [a, _, c, _]) = chain();
        let before = h.document().clone();
        assert!(h.move_entity(a, ParentTarget::Entity(c)).unwrap_err().is_cyclic_move());
        assert!(h.move_entity(a, ParentTarget::Entity(a)).unwrap_err().is_cyclic_move());
        assert_eq!(h.document(), &before);
    }

    #[test]
    fn moving_reparents_within_a_level() {
        let (mut h, [a, b, c, d]) = chain();
        h.move_entity(b, ParentTarget::Entity(d)).unwrap();
        assert_eq!(h.entity(b).unwrap().parent_id, Some(d));
        assert_eq!(h.children(d).unwrap(), vec![b]);
        assert_eq!(h.descendants(d).unwrap(), vec![b, c]);
        assert!(h.children(a).unwrap().is_empty());
    }

    #[test]
    fn moving_across_levels_takes_the_subtree() {
        let (mut h, [a, b, c, d]) = chain();
        let second = h.add_level(Some("Second")).unwrap();
        h.move_entity(b, ParentTarget::Level(second)).unwrap();

        let level = h.level(second).unwrap();
        let ids: Vec<u32> = level.entities.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![b, c]);
        assert_eq!(h.entity(b).unwrap().parent_id, None);
        assert_eq!(h.entity(c).unwrap().parent_id, Some(b));
        assert_eq!(h.display_path(c), Some("Main/Second/B/C"));

        h.move_entity(b, ParentTarget::Entity(d)).unwrap();
        assert_eq!(h.level_of(c).unwrap(), 0);
        assert_eq!(h.descendants(a).unwrap(), Vec::<u32>::new());
    }

    #[test]
    fn blank_names_are_rejected() {
        let (mut h, [a, ..]) = chain();
        assert!(matches!(
            h.rename_entity(a, "   "),
            Err(Error::Hierarchy(HierarchyError::InvalidName(_)))
        ));
        assert!(h.rename_level(0, "").is_err());
        h.rename_entity(a, "  Root ").unwrap();
        assert_eq!(h.entity(a).unwrap().name, "Root");
    }

    #[test]
    fn main_camera_is_unique_across_levels() {
        let mut h = scene();
        let second = h.add_level(Some("Second")).unwrap();
        let first_cam = h.add_entity(0, None, Some("Cam1")).unwrap();
        let second_cam = h.add_entity(second, None, Some("Cam2")).unwrap();
        h.add_component(first_cam, Component::camera()).unwrap();
        h.add_component(second_cam, Component::light()).unwrap();
        h.add_component(second_cam, Component::camera()).unwrap();

        h.set_main_camera(first_cam, 0).unwrap();
        assert_eq!(h.main_camera(), Some((first_cam, 0)));
        h.set_main_camera(second_cam, 1).unwrap();
        assert_eq!(h.main_camera(), Some((second_cam, 1)));
        assert!(!h.entity(first_cam).unwrap().components[0].is_main_camera);

        assert!(matches!(
            h.set_main_camera(second_cam, 0),
            Err(Error::Hierarchy(HierarchyError::NotACamera { .. }))
        ));
        assert!(h.set_main_camera(second_cam, 9).unwrap_err().is_not_found());
    }

    #[test]
    fn models_attach_and_detach() {
        let (mut h, [a, ..]) = chain();
        assert!(matches!(
            h.attach_model(a, 0),
            Err(Error::Hierarchy(HierarchyError::InvalidModel(0)))
        ));
        h.attach_model(a, 5001).unwrap();
        assert_eq!(h.entity(a).unwrap().components[0].model_id, Some(5001));
        assert!(h.detach_model(a, 5002).unwrap_err().is_not_found());
        h.detach_model(a, 5001).unwrap();
        assert!(h.entity(a).unwrap().components.is_empty());
    }

    #[test]
    fn properties_edit_through_the_rules() {
        let (mut h, [a, ..]) = chain();
        let cam = h.add_component(a, Component::camera()).unwrap();
        let target = PropertyTarget::Component { entity: a, index: cam };
        h.set_property(target, "isMainCamera", "true").unwrap();
        assert_eq!(h.main_camera(), Some((a, cam)));
        h.set_property(target, "fov", "90").unwrap();
        assert_eq!(h.get_property(target, "fov").unwrap(), Value::Float(90.0));

        h.set_property(PropertyTarget::Entity(a), "position", "1, 2, 3").unwrap();
        assert_eq!(
            h.get_property(PropertyTarget::Entity(a), "position").unwrap(),
            Value::Vec3([1.0, 2.0, 3.0])
        );
        assert!(h.set_property(PropertyTarget::Entity(a), "name", " ").is_err());
        h.set_property(PropertyTarget::Level(0), "visible", "false").unwrap();
        assert!(!h.level(0).unwrap().visible);
        assert_eq!(h.fields(PropertyTarget::Entity(a)).unwrap()[0].name, "id");
    }

    #[test]
    fn level_operations() {
        let (mut h, _) = chain();
        let second = h.add_level(None).unwrap();
        assert!(h.level(second).unwrap().name.starts_with("Level_"));
        assert_eq!(h.level(second).unwrap().order, 1);
        h.rename_level(second, "Caves").unwrap();
        assert_eq!(h.level_index("caves"), Some(second));
        h.set_level_enabled(second, false).unwrap();
        let removed = h.delete_level(0).unwrap();
        assert_eq!(removed.entities.len(), 4);
        assert!(h.entity(1).is_err());
        assert!(h.delete_level(5).unwrap_err().is_not_found());
    }

    #[test]
    fn tree_is_derived_from_links() {
        let (mut h, [a, b, c, d]) = chain();
        let second = h.add_level(Some("Second")).unwrap();
        h.set_property(PropertyTarget::Level(second), "order", "-1").unwrap();
        let tree = h.tree();
        assert_eq!(tree.name, "Main");
        assert_eq!(tree.levels[0].name, "Second");
        let default = &tree.levels[1];
        let roots: Vec<u32> = default.roots.iter().map(|n| n.id).collect();
        assert_eq!(roots, vec![a, d]);
        assert_eq!(default.roots[0].children[0].id, b);
        assert_eq!(default.roots[0].children[0].children[0].id, c);
    }

    #[test]
    fn load_repairs_broken_links() {
        let mut document = SceneDocument::new("Broken");
        let level = &mut document.levels[0];
        let e = |id, parent| {
            let mut entity = Entity::new(id, None);
            entity.parent_id = parent;
            entity
        };
        level.entities = vec![
            e(1, Some(99)),
            e(2, Some(3)),
            e(3, Some(2)),
            e(4, None),
            e(4, Some(1)),
        ];
        let mut main = Component::camera();
        main.is_main_camera = true;
        level.entities[3].components = vec![main.clone(), main];

        let h = EntityHierarchy::detached(document);
        let report = h.repairs();
        assert_eq!(report.dangling_parents, vec![1]);
        assert_eq!(report.broken_cycles, vec![2]);
        assert_eq!(report.reassigned_ids, vec![(4, 5)]);
        assert_eq!(report.demoted_main_cameras, vec![4]);
        assert_eq!(h.entity(1).unwrap().parent_id, None);
        assert_eq!(h.entity(5).unwrap().parent_id, Some(1));
        assert_eq!(h.next_entity_id(), Some(6));
        assert_eq!(h.display_path(3), Some("Broken/Default/Entity_2/Entity_3"));
    }

    #[test]
    fn adding_past_the_last_id_is_an_error() {
        let mut document = SceneDocument::new("Full");
        document.levels[0].entities.push(Entity::new(u32::MAX, None));

        let mut h = EntityHierarchy::detached(document);
        assert_eq!(h.next_entity_id(), None);
        let err = h.add_entity(0, None, Some("One more")).unwrap_err();
        assert!(matches!(err, Error::Hierarchy(HierarchyError::IdsExhausted)));
        assert_eq!(h.document().entities().count(), 1);
    }

    #[test]
    fn the_last_id_is_handed_out_once() {
        let mut document = SceneDocument::new("Almost");
        document.levels[0].entities.push(Entity::new(u32::MAX - 1, None));

        let mut h = EntityHierarchy::detached(document);
        assert_eq!(h.add_entity(0, None, None).unwrap(), u32::MAX);
        assert!(h.add_entity(0, None, None).is_err());
    }

    #[test]
    fn duplicates_at_the_last_id_take_the_lowest_free_ids() {
        let mut document = SceneDocument::new("Wrapped");
        document.levels[0].entities = vec![
            Entity::new(u32::MAX, None),
            Entity::new(u32::MAX, None),
            Entity::new(1, None),
            Entity::new(u32::MAX, None),
        ];

        let h = EntityHierarchy::detached(document);
        assert_eq!(
            h.repairs().reassigned_ids,
            vec![(u32::MAX, 2), (u32::MAX, 3)]
        );
        let ids: Vec<u32> = h.document().entities().map(|e| e.id).collect();
        assert_eq!(ids, vec![u32::MAX, 2, 1, 3]);
    }
}
