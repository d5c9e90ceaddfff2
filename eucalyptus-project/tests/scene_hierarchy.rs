use std::fs;

use eucalyptus_project::io::SaveMode;
use eucalyptus_project::{
    Component, EntityHierarchy, ParentTarget, PropertyTarget, SceneDocument, SceneStore,
};

fn open(dir: &tempfile::TempDir) -> (SceneStore, EntityHierarchy) {
    let store = SceneStore::new(dir.path().join("Main.json"), SaveMode::Atomic);
    let hierarchy = EntityHierarchy::open(store.clone()).unwrap();
    (store, hierarchy)
}

#[test]
fn every_change_is_written_back() {
    let dir = tempfile::tempdir().unwrap();
    let (store, mut scene) = open(&dir);

    let a = scene.add_entity(0, None, Some("A")).unwrap();
    let b = scene.add_entity(0, Some(a), Some("B")).unwrap();
    scene.rename_entity(b, "Child").unwrap();

    let saved = store.load().unwrap();
    assert_eq!(saved.name, "Main");
    let entities = &saved.levels[0].entities;
    assert_eq!(entities.len(), 2);
    assert_eq!(entities[1].name, "Child");
    assert_eq!(entities[1].parent_id, Some(a));
}

#[test]
fn deleting_a_chain_removes_it_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let (store, mut scene) = open(&dir);
    let a = scene.add_entity(0, None, None).unwrap();
    let b = scene.add_entity(0, Some(a), None).unwrap();
    scene.add_entity(0, Some(b), None).unwrap();

    scene.delete_entity(a).unwrap();

    assert!(store.load().unwrap().levels[0].entities.is_empty());
    assert!(scene.add_entity(0, Some(b), None).unwrap_err().is_not_found());
}

#[test]
fn rejected_moves_do_not_touch_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let (store, mut scene) = open(&dir);
    let a = scene.add_entity(0, None, None).unwrap();
    let b = scene.add_entity(0, Some(a), None).unwrap();
    let before = fs::read_to_string(store.path()).unwrap();

    assert!(scene.move_entity(a, ParentTarget::Entity(b)).unwrap_err().is_cyclic_move());
    assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
}

#[test]
fn ids_continue_after_reopening() {
    let dir = tempfile::tempdir().unwrap();
    {
        let (_, mut scene) = open(&dir);
        scene.add_entity(0, None, None).unwrap();
        let second = scene.add_entity(0, None, None).unwrap();
        scene.delete_entity(second).unwrap();
    }
    let (_, mut scene) = open(&dir);
    // the deleted id 2 is not in the file any more, so counting restarts after 1
    assert_eq!(scene.add_entity(0, None, None).unwrap(), 2);
}

#[test]
fn dangling_parents_are_repaired_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Broken.json");
    fs::write(
        &path,
        r#"{
            "version": 1,
            "name": "Broken",
            "levels": [
                {"name": "A", "order": 0, "visible": true, "enabled": true,
                 "entities": [{"id": 1, "name": "Orphan", "active": true, "parentId": 2,
                               "transform": {"position": [0,0,0], "rotation": [0,0,0], "scale": [1,1,1]},
                               "components": []}]},
                {"name": "B", "order": 1, "visible": true, "enabled": true,
                 "entities": [{"id": 2, "name": "Elsewhere"}]}
            ]
        }"#,
    )
    .unwrap();

    let scene = EntityHierarchy::open(SceneStore::new(&path, SaveMode::Overwrite)).unwrap();
    assert_eq!(scene.repairs().dangling_parents, vec![1]);
    assert_eq!(scene.display_path(1), Some("Broken/A/Orphan"));
    assert_eq!(scene.next_entity_id(), Some(3));
}

#[test]
fn main_camera_and_properties_survive_a_reload() {
    let dir = tempfile::tempdir().unwrap();
    let (store, mut scene) = open(&dir);
    let level = scene.add_level(Some("Upper")).unwrap();
    let first = scene.add_entity(0, None, Some("Cam A")).unwrap();
    let second = scene.add_entity(level, None, Some("Cam B")).unwrap();
    scene.add_component(first, Component::camera()).unwrap();
    let index = scene.add_component(second, Component::camera()).unwrap();

    scene
        .set_property(PropertyTarget::Component { entity: first, index: 0 }, "isMainCamera", "true")
        .unwrap();
    scene.set_main_camera(second, index).unwrap();
    scene
        .set_property(PropertyTarget::Entity(second), "rotation", "0, 90, 0")
        .unwrap();

    let reopened = EntityHierarchy::open(store).unwrap();
    assert_eq!(reopened.main_camera(), Some((second, index)));
    assert!(reopened.repairs().is_clean());
    let entity = reopened.entity(second).unwrap();
    assert_eq!(entity.transform.rotation, glam::Vec3::new(0.0, 90.0, 0.0));
}

#[test]
fn missing_scene_opens_as_default_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let (store, scene) = open(&dir);
    assert_eq!(scene.document(), &SceneDocument::new("Main"));
    assert!(!store.path().exists());
}
