//! Handlers for each subcommand. Every handler opens the package, performs one
//! operation and reports the outcome.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;
use clap::ArgMatches;
use eucalyptus_project::folders::CreateOutcome;
use eucalyptus_project::hierarchy::{EntityNode, SceneTree};
use eucalyptus_project::{
    Component, EntityHierarchy, FolderNode, Package, ParentTarget, PropertyTarget, ResourceKind,
    ResourceManifest, ResourceQuery,
};

pub fn run(package_dir: &Path, matches: &ArgMatches) -> anyhow::Result<()> {
    match matches.subcommand() {
        Some(("init", _)) => {
            let package = Package::create(package_dir)?;
            success!("Package ready at {}", package.dir().display());
        }
        Some(("tree", _)) => {
            let package = Package::open(package_dir)?;
            print!("{}", render_tree(&package.folder_tree(), package.manifest().manifest()));
        }
        Some(("folder", sub)) => folder(&mut Package::open(package_dir)?, sub)?,
        Some(("resource", sub)) => resource(&mut Package::open(package_dir)?, sub)?,
        Some(("scene", sub)) => scene(&mut Package::open(package_dir)?, sub)?,
        Some((name, sub)) => {
            let package = Package::open(package_dir)?;
            let reference = required(sub_of(sub)?, "scene")?;
            let mut hierarchy = package
                .open_scene(reference)
                .with_context(|| format!("Unable to open scene {reference}"))?;
            report_repairs(&hierarchy);
            match name {
                "level" => level(&mut hierarchy, sub)?,
                "entity" => entity(&mut hierarchy, sub)?,
                "model" => model(&package, &mut hierarchy, sub)?,
                "camera" => camera(&mut hierarchy, sub)?,
                _ => unreachable!(),
            }
        }
        None => unreachable!(),
    }
    Ok(())
}

fn sub_of(matches: &ArgMatches) -> anyhow::Result<&ArgMatches> {
    matches
        .subcommand()
        .map(|(_, sub)| sub)
        .context("Missing subcommand")
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> anyhow::Result<&'a str> {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .with_context(|| format!("Missing argument {id}"))
}

fn required_id<T: Copy + Send + Sync + 'static>(matches: &ArgMatches, id: &str) -> anyhow::Result<T> {
    matches
        .get_one::<T>(id)
        .copied()
        .with_context(|| format!("Missing argument {id}"))
}

fn folder(package: &mut Package, matches: &ArgMatches) -> anyhow::Result<()> {
    let store = package.manifest_mut();
    match matches.subcommand() {
        Some(("create", sub)) => {
            match store.create_folder(required(sub, "parent")?, required(sub, "name")?)? {
                CreateOutcome::Created(path) => success!("Created folder {}", path),
                CreateOutcome::AlreadyExists(path) => warn!("Folder {} already exists", path),
            }
        }
        Some(("delete", sub)) => {
            let path = required(sub, "path")?;
            let removed = store.delete_folder(path)?;
            success!(
                "Deleted {} with {} resource(s) and {} empty folder(s)",
                path,
                removed.resources.len(),
                removed.markers.len()
            );
        }
        Some(("rename", sub)) => {
            let rewrite = store.rename_folder(required(sub, "path")?, required(sub, "name")?)?;
            report_rewrite("Renamed", &rewrite);
        }
        Some(("move", sub)) => {
            let rewrite = store.move_folder(required(sub, "path")?, required(sub, "target")?)?;
            report_rewrite("Moved", &rewrite);
        }
        _ => unreachable!(),
    }
    Ok(())
}

fn report_rewrite(verb: &str, rewrite: &eucalyptus_project::Rewrite) {
    if rewrite.is_noop() {
        notice!("Nothing to change");
    } else {
        success!(
            "{} to {}, {} resource(s) updated",
            verb,
            rewrite.new_path,
            rewrite.resources
        );
    }
}

fn resource(package: &mut Package, matches: &ArgMatches) -> anyhow::Result<()> {
    match matches.subcommand() {
        Some(("list", sub)) => {
            let mut query = ResourceQuery::default();
            if let Some(kind) = sub.get_one::<String>("kind") {
                query = query.kind(kind);
            }
            if let Some(text) = sub.get_one::<String>("search") {
                query = query.search(text);
            }
            if let Some(folder) = sub.get_one::<String>("folder") {
                query = query.folder(folder);
            }
            let index = package.index();
            let mut shown = 0;
            for item in index.filter(&query) {
                println!("{:>6}  {:<10}  {}", item.id, item.kind.to_string(), item.virtual_path);
                shown += 1;
            }
            notice!("{} of {} resource(s)", shown, index.items().len());
        }
        Some(("add", sub)) => {
            let kind: ResourceKind = required(sub, "kind")?.parse()?;
            let store = package.manifest_mut();
            let id = store.manifest().peek_id()?;
            store.record(id, required(sub, "storage")?, required(sub, "virtual_path")?, kind)?;
            success!("Recorded resource {}", id);
        }
        Some(("import", sub)) => {
            let kind = match sub.get_one::<String>("kind") {
                Some(kind) => Some(kind.parse::<ResourceKind>()?),
                None => None,
            };
            let file = required(sub, "file")?;
            let id = package.import_file(file, required(sub, "folder")?, kind)?;
            success!("Imported {} as resource {}", file, id);
        }
        Some(("move", sub)) => {
            let id = required_id::<u32>(sub, "id")?;
            let path = package
                .manifest_mut()
                .move_resource(id, required(sub, "target")?)?;
            success!("Resource {} is now at {}", id, path);
        }
        Some(("remove", sub)) => {
            let id = required_id::<u32>(sub, "id")?;
            let entry = package.manifest_mut().remove_resource(id)?;
            success!("Removed resource {} ({})", id, entry.display_path());
        }
        _ => unreachable!(),
    }
    Ok(())
}

fn scene(package: &mut Package, matches: &ArgMatches) -> anyhow::Result<()> {
    match matches.subcommand() {
        Some(("create", sub)) => {
            let (id, hierarchy) =
                package.create_scene(required(sub, "folder")?, required(sub, "name")?)?;
            success!("Created scene {} as resource {}", hierarchy.document().name, id);
        }
        Some(("list", _)) => {
            for (id, path) in package.scenes() {
                println!("{:>6}  {}", id, path);
            }
        }
        Some(("show", sub)) => {
            let hierarchy = package.open_scene(required(sub, "scene")?)?;
            report_repairs(&hierarchy);
            print!("{}", render_scene(&hierarchy.tree(), hierarchy.main_camera()));
        }
        _ => unreachable!(),
    }
    Ok(())
}

/// Accepts a level index or a level name.
fn level_ref(hierarchy: &EntityHierarchy, text: &str) -> anyhow::Result<usize> {
    if let Ok(index) = text.parse::<usize>() {
        return Ok(index);
    }
    hierarchy
        .level_index(text)
        .with_context(|| format!("No level named {text}"))
}

fn level(hierarchy: &mut EntityHierarchy, matches: &ArgMatches) -> anyhow::Result<()> {
    match matches.subcommand() {
        Some(("add", sub)) => {
            let index = hierarchy.add_level(sub.get_one::<String>("name").map(String::as_str))?;
            success!("Added level {} ({})", index, hierarchy.level(index)?.name);
        }
        Some(("delete", sub)) => {
            let index = level_ref(hierarchy, required(sub, "level")?)?;
            let level = hierarchy.delete_level(index)?;
            success!("Deleted level {} with {} entities", level.name, level.entities.len());
        }
        Some(("rename", sub)) => {
            let index = level_ref(hierarchy, required(sub, "level")?)?;
            hierarchy.rename_level(index, required(sub, "name")?)?;
            success!("Renamed level {} to {}", index, hierarchy.level(index)?.name);
        }
        _ => unreachable!(),
    }
    Ok(())
}

fn entity(hierarchy: &mut EntityHierarchy, matches: &ArgMatches) -> anyhow::Result<()> {
    match matches.subcommand() {
        Some(("add", sub)) => {
            let level = level_ref(hierarchy, required(sub, "level")?)?;
            let parent = sub.get_one::<u32>("parent").copied();
            let name = sub.get_one::<String>("name").map(String::as_str);
            let id = hierarchy.add_entity(level, parent, name)?;
            success!("Added entity {} at {}", id, hierarchy.display_path(id).unwrap_or_default());
        }
        Some(("delete", sub)) => {
            let removed = hierarchy.delete_entity(required_id(sub, "entity")?)?;
            success!("Deleted {} entities", removed.len());
        }
        Some(("rename", sub)) => {
            let id = required_id(sub, "entity")?;
            hierarchy.rename_entity(id, required(sub, "name")?)?;
            success!("Entity {} is now {}", id, hierarchy.display_path(id).unwrap_or_default());
        }
        Some(("move", sub)) => {
            let id = required_id(sub, "entity")?;
            let target = match sub.get_one::<u32>("parent") {
                Some(parent) => ParentTarget::Entity(*parent),
                None => ParentTarget::Level(level_ref(hierarchy, required(sub, "level")?)?),
            };
            hierarchy.move_entity(id, target)?;
            success!("Entity {} is now {}", id, hierarchy.display_path(id).unwrap_or_default());
        }
        Some(("show", sub)) => {
            let id = required_id(sub, "entity")?;
            print!("{}", render_properties(hierarchy, id)?);
        }
        Some(("set", sub)) => {
            let id = required_id(sub, "entity")?;
            let target = match sub.get_one::<usize>("component") {
                Some(index) => PropertyTarget::Component {
                    entity: id,
                    index: *index,
                },
                None => PropertyTarget::Entity(id),
            };
            let field = required(sub, "field")?;
            let value = hierarchy.set_property(target, field, required(sub, "value")?)?;
            success!("{} = {}", field, value);
        }
        _ => unreachable!(),
    }
    Ok(())
}

fn model(package: &Package, hierarchy: &mut EntityHierarchy, matches: &ArgMatches) -> anyhow::Result<()> {
    match matches.subcommand() {
        Some(("attach", sub)) => {
            let id = required_id(sub, "entity")?;
            let model = required_id(sub, "model")?;
            let index = package.attach_model(hierarchy, id, model)?;
            success!("Attached model {} to entity {} as component {}", model, id, index);
        }
        Some(("detach", sub)) => {
            let id = required_id(sub, "entity")?;
            let model = required_id(sub, "model")?;
            hierarchy.detach_model(id, model)?;
            success!("Detached model {} from entity {}", model, id);
        }
        _ => unreachable!(),
    }
    Ok(())
}

fn camera(hierarchy: &mut EntityHierarchy, matches: &ArgMatches) -> anyhow::Result<()> {
    match matches.subcommand() {
        Some(("add", sub)) => {
            let id = required_id(sub, "entity")?;
            let index = hierarchy.add_component(id, Component::camera())?;
            if sub.get_flag("main") {
                hierarchy.set_main_camera(id, index)?;
            }
            success!("Added camera component {} to entity {}", index, id);
        }
        Some(("main", sub)) => {
            let id = required_id(sub, "entity")?;
            let index = required_id(sub, "index")?;
            hierarchy.set_main_camera(id, index)?;
            success!("Main camera is component {} of entity {}", index, id);
        }
        _ => unreachable!(),
    }
    Ok(())
}

fn report_repairs(hierarchy: &EntityHierarchy) {
    let repairs = hierarchy.repairs();
    if repairs.is_clean() {
        return;
    }
    if !repairs.dangling_parents.is_empty() {
        warn!("Moved entities with missing parents to the level root: {:?}", repairs.dangling_parents);
    }
    if !repairs.broken_cycles.is_empty() {
        warn!("Broke parent cycles at entities {:?}", repairs.broken_cycles);
    }
    for (old, new) in &repairs.reassigned_ids {
        warn!("Duplicate entity id {} was changed to {}", old, new);
    }
    if !repairs.demoted_main_cameras.is_empty() {
        warn!("Cleared extra main cameras on entities {:?}", repairs.demoted_main_cameras);
    }
}

/// Folders with their resources, indented by depth.
fn render_tree(tree: &FolderNode, manifest: &ResourceManifest) -> String {
    let mut out = String::new();
    for (depth, node) in tree.iter() {
        let indent = "  ".repeat(depth.saturating_sub(1));
        let resource_indent = if node.is_root() { String::new() } else { "  ".repeat(depth) };
        if !node.is_root() {
            let _ = writeln!(out, "{indent}{}/", node.name);
        }
        for id in &node.resources {
            if let Some(entry) = manifest.resource(*id) {
                let _ = writeln!(out, "{resource_indent}{} [{}] #{}", entry.name(), entry.kind, id);
            }
        }
    }
    out
}

fn render_scene(tree: &SceneTree, main_camera: Option<(u32, usize)>) -> String {
    fn entity_lines(out: &mut String, node: &EntityNode, depth: usize, main: Option<u32>) {
        let _ = write!(out, "{}{} #{}", "  ".repeat(depth), node.name, node.id);
        if !node.active {
            out.push_str(" (inactive)");
        }
        if main == Some(node.id) {
            out.push_str(" (main camera)");
        }
        out.push('\n');
        for child in &node.children {
            entity_lines(out, child, depth + 1, main);
        }
    }

    let mut out = format!("{}\n", tree.name);
    let main = main_camera.map(|(id, _)| id);
    for level in &tree.levels {
        let _ = write!(out, "  [{}] {}", level.index, level.name);
        if !level.visible {
            out.push_str(" (hidden)");
        }
        if !level.enabled {
            out.push_str(" (disabled)");
        }
        out.push('\n');
        for root in &level.roots {
            entity_lines(&mut out, root, 2, main);
        }
    }
    out
}

fn render_properties(hierarchy: &EntityHierarchy, id: u32) -> anyhow::Result<String> {
    let mut out = String::new();
    let section = |out: &mut String, title: String, target: PropertyTarget| -> anyhow::Result<()> {
        let _ = writeln!(out, "{title}");
        for field in hierarchy.fields(target)? {
            let value = hierarchy.get_property(target, field.name)?;
            let marker = if field.editable { "" } else { " (read only)" };
            let _ = writeln!(out, "  {:<14} {}{}", field.name, value, marker);
        }
        Ok(())
    };

    section(&mut out, format!("Entity {id}"), PropertyTarget::Entity(id))?;
    for (index, component) in hierarchy.entity(id)?.components.iter().enumerate() {
        section(
            &mut out,
            format!("Component {index} ({})", component.kind),
            PropertyTarget::Component { entity: id, index },
        )?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli;

    fn run_args(dir: &Path, args: &[&str]) -> anyhow::Result<()> {
        let matches = cli().try_get_matches_from(std::iter::once("eucalyptus-cli").chain(args.iter().copied()))?;
        run(dir, &matches)
    }

    #[test]
    fn folder_commands_edit_the_manifest() {
        let dir = tempfile::tempdir().unwrap();
        run_args(dir.path(), &["init"]).unwrap();
        run_args(dir.path(), &["folder", "create", "", "Env"]).unwrap();
        run_args(dir.path(), &["folder", "create", "Env", "Trees"]).unwrap();
        run_args(dir.path(), &["resource", "add", "Env/Trees/oak", "--kind", "Texture", "--storage", "Textures/oak.png"]).unwrap();
        run_args(dir.path(), &["folder", "rename", "Env", "World"]).unwrap();

        let package = Package::open(dir.path()).unwrap();
        let manifest = package.manifest().manifest();
        assert_eq!(manifest.resources[0].virtual_path.as_deref(), Some("World/Trees/oak"));
        assert!(run_args(dir.path(), &["folder", "move", "World", "World/Trees"]).is_err());
        assert!(run_args(dir.path(), &["folder", "delete", "Nope"]).is_err());
    }

    #[test]
    fn scene_commands_edit_the_scene_file() {
        let dir = tempfile::tempdir().unwrap();
        run_args(dir.path(), &["init"]).unwrap();
        run_args(dir.path(), &["scene", "create", "", "Main"]).unwrap();
        run_args(dir.path(), &["entity", "add", "Main", "Default", "--name", "Player"]).unwrap();
        run_args(dir.path(), &["entity", "add", "Main", "0", "--parent", "1", "--name", "Eye"]).unwrap();
        run_args(dir.path(), &["camera", "add", "Main", "2", "--main"]).unwrap();
        run_args(dir.path(), &["entity", "set", "Main", "1", "position", "1, 2, 3"]).unwrap();
        run_args(dir.path(), &["level", "add", "Main", "Upper"]).unwrap();
        run_args(dir.path(), &["entity", "move", "Main", "1", "--level", "Upper"]).unwrap();

        let package = Package::open(dir.path()).unwrap();
        let scene = package.open_scene("Main").unwrap();
        assert_eq!(scene.display_path(2), Some("Main/Upper/Player/Eye"));
        assert_eq!(scene.main_camera(), Some((2, 0)));
        assert_eq!(scene.entity(1).unwrap().transform.position.to_array(), [1.0, 2.0, 3.0]);
        assert!(run_args(dir.path(), &["entity", "move", "Main", "1", "--parent", "2"]).is_err());
    }

    #[test]
    fn tree_rendering_indents_folders_and_lists_resources() {
        let mut manifest = ResourceManifest::default();
        manifest.create_folder("", "Env").unwrap();
        manifest.upsert(
            eucalyptus_project::ResourceEntry {
                id: 5000,
                storage_path: "Textures/oak.png".to_string(),
                virtual_path: Some("Env/Trees/oak".to_string()),
                kind: ResourceKind::Texture,
            },
            Default::default(),
        );
        let tree = eucalyptus_project::folder_tree::build(&manifest.resources, &manifest.empty_folders);

        assert_eq!(render_tree(&tree, &manifest), "Env/\n  Trees/\n    oak [Texture] #5000\n");
    }
}
