#[macro_use]
mod logging;
mod commands;

use clap::{Arg, ArgAction, ArgGroup, Command};
use std::path::PathBuf;

fn main() {
    let matches = cli().get_matches();
    init_logging(matches.get_count("verbose"));

    let package_dir = matches
        .get_one::<String>("package")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    if let Err(e) = commands::run(&package_dir, &matches) {
        fatal!("{:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbosity: u8) {
    if std::env::var_os("RUST_LOG").is_none() {
        let log_config = match verbosity {
            0 if cfg!(debug_assertions) => "eucalyptus_project=debug,eucalyptus_cli=debug,warn",
            0 => "warn",
            _ => "eucalyptus_project=trace,eucalyptus_cli=trace,warn",
        };
        unsafe { std::env::set_var("RUST_LOG", log_config) };
    }
    env_logger::init();
}

fn scene_arg() -> Arg {
    Arg::new("scene")
        .help("Scene resource id, virtual path or file relative to the package")
        .value_name("SCENE")
        .required(true)
}

fn entity_arg() -> Arg {
    Arg::new("entity")
        .help("Entity id")
        .value_name("ENTITY_ID")
        .value_parser(clap::value_parser!(u32))
        .required(true)
}

fn level_arg() -> Arg {
    Arg::new("level")
        .help("Level index or name")
        .value_name("LEVEL")
        .required(true)
}

pub fn cli() -> Command {
    Command::new("eucalyptus-cli")
        .about("Edits the folder tree and scenes of a eucalyptus package")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("package")
                .long("package")
                .short('p')
                .help("Package or project directory, defaults to the current directory")
                .value_name("DIR")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log everything the package core does")
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(Command::new("init").about("Create a package in the package directory"))
        .subcommand(Command::new("tree").about("Print the virtual folder tree"))
        .subcommand(
            Command::new("folder")
                .about("Edit virtual folders")
                .subcommand_required(true)
                .subcommand(
                    Command::new("create")
                        .about("Create an empty folder")
                        .arg(
                            Arg::new("parent")
                                .help("Parent folder, empty for the root")
                                .value_name("PARENT")
                                .required(true),
                        )
                        .arg(
                            Arg::new("name")
                                .help("Name of the new folder")
                                .value_name("NAME")
                                .required(true),
                        ),
                )
                .subcommand(
                    Command::new("delete")
                        .about("Delete a folder and every resource inside it")
                        .arg(
                            Arg::new("path")
                                .help("Folder to delete")
                                .value_name("PATH")
                                .required(true),
                        ),
                )
                .subcommand(
                    Command::new("rename")
                        .about("Rename a folder")
                        .arg(
                            Arg::new("path")
                                .help("Folder to rename")
                                .value_name("PATH")
                                .required(true),
                        )
                        .arg(
                            Arg::new("name")
                                .help("New name of the folder")
                                .value_name("NEW_NAME")
                                .required(true),
                        ),
                )
                .subcommand(
                    Command::new("move")
                        .about("Move a folder under another folder")
                        .arg(
                            Arg::new("path")
                                .help("Folder to move")
                                .value_name("PATH")
                                .required(true),
                        )
                        .arg(
                            Arg::new("target")
                                .help("New parent folder, empty for the root")
                                .value_name("TARGET_PARENT")
                                .required(true),
                        ),
                ),
        )
        .subcommand(
            Command::new("resource")
                .about("List and place resources")
                .subcommand_required(true)
                .subcommand(
                    Command::new("list")
                        .about("List resources")
                        .arg(Arg::new("kind").long("kind").help("Only this resource type").value_name("KIND"))
                        .arg(
                            Arg::new("search")
                                .long("search")
                                .help("Case-insensitive text in the name or path")
                                .value_name("TEXT"),
                        )
                        .arg(
                            Arg::new("folder")
                                .long("folder")
                                .help("Only resources inside this folder")
                                .value_name("FOLDER"),
                        ),
                )
                .subcommand(
                    Command::new("add")
                        .about("Record a resource that is already stored in the package")
                        .arg(
                            Arg::new("virtual_path")
                                .help("Virtual path of the resource")
                                .value_name("VIRTUAL_PATH")
                                .required(true),
                        )
                        .arg(
                            Arg::new("kind")
                                .long("kind")
                                .help("Resource type")
                                .value_name("KIND")
                                .required(true),
                        )
                        .arg(
                            Arg::new("storage")
                                .long("storage")
                                .help("Storage path relative to the package")
                                .value_name("PATH")
                                .required(true),
                        ),
                )
                .subcommand(
                    Command::new("import")
                        .about("Copy a file into the package and record it")
                        .arg(
                            Arg::new("file")
                                .help("File to import")
                                .value_name("FILE")
                                .required(true),
                        )
                        .arg(
                            Arg::new("folder")
                                .long("folder")
                                .help("Folder to place the resource in")
                                .value_name("FOLDER")
                                .default_value(""),
                        )
                        .arg(
                            Arg::new("kind")
                                .long("kind")
                                .help("Resource type, guessed from the extension when missing")
                                .value_name("KIND"),
                        ),
                )
                .subcommand(
                    Command::new("move")
                        .about("Move a resource into another folder")
                        .arg(
                            Arg::new("id")
                                .help("Resource id")
                                .value_name("ID")
                                .value_parser(clap::value_parser!(u32))
                                .required(true),
                        )
                        .arg(
                            Arg::new("target")
                                .help("Target folder, empty for the root")
                                .value_name("TARGET_PARENT")
                                .required(true),
                        ),
                )
                .subcommand(
                    Command::new("remove")
                        .about("Forget a resource")
                        .arg(
                            Arg::new("id")
                                .help("Resource id")
                                .value_name("ID")
                                .value_parser(clap::value_parser!(u32))
                                .required(true),
                        ),
                ),
        )
        .subcommand(
            Command::new("scene")
                .about("Create and inspect scenes")
                .subcommand_required(true)
                .subcommand(
                    Command::new("create")
                        .about("Create a scene file and record it")
                        .arg(
                            Arg::new("folder")
                                .help("Folder for the scene resource")
                                .value_name("FOLDER")
                                .required(true),
                        )
                        .arg(
                            Arg::new("name")
                                .help("Scene name")
                                .value_name("NAME")
                                .required(true),
                        ),
                )
                .subcommand(Command::new("list").about("List the scenes of the package"))
                .subcommand(
                    Command::new("show")
                        .about("Print the levels and entities of a scene")
                        .arg(scene_arg()),
                ),
        )
        .subcommand(
            Command::new("level")
                .about("Edit the levels of a scene")
                .subcommand_required(true)
                .subcommand(
                    Command::new("add")
                        .about("Add a level")
                        .arg(scene_arg())
                        .arg(Arg::new("name").help("Level name").value_name("NAME")),
                )
                .subcommand(
                    Command::new("delete")
                        .about("Delete a level and its entities")
                        .arg(scene_arg())
                        .arg(level_arg()),
                )
                .subcommand(
                    Command::new("rename")
                        .about("Rename a level")
                        .arg(scene_arg())
                        .arg(level_arg())
                        .arg(
                            Arg::new("name")
                                .help("New level name")
                                .value_name("NAME")
                                .required(true),
                        ),
                ),
        )
        .subcommand(
            Command::new("entity")
                .about("Edit the entities of a scene")
                .subcommand_required(true)
                .subcommand(
                    Command::new("add")
                        .about("Add an entity")
                        .arg(scene_arg())
                        .arg(level_arg())
                        .arg(
                            Arg::new("parent")
                                .long("parent")
                                .help("Parent entity id")
                                .value_name("ID")
                                .value_parser(clap::value_parser!(u32)),
                        )
                        .arg(Arg::new("name").long("name").help("Entity name").value_name("NAME")),
                )
                .subcommand(
                    Command::new("delete")
                        .about("Delete an entity and its descendants")
                        .arg(scene_arg())
                        .arg(entity_arg()),
                )
                .subcommand(
                    Command::new("rename")
                        .about("Rename an entity")
                        .arg(scene_arg())
                        .arg(entity_arg())
                        .arg(
                            Arg::new("name")
                                .help("New entity name")
                                .value_name("NAME")
                                .required(true),
                        ),
                )
                .subcommand(
                    Command::new("move")
                        .about("Reparent an entity")
                        .arg(scene_arg())
                        .arg(entity_arg())
                        .arg(
                            Arg::new("parent")
                                .long("parent")
                                .help("New parent entity id")
                                .value_name("ID")
                                .value_parser(clap::value_parser!(u32)),
                        )
                        .arg(
                            Arg::new("level")
                                .long("level")
                                .help("Level to move to as a root entity")
                                .value_name("LEVEL"),
                        )
                        .group(
                            ArgGroup::new("destination")
                                .args(["parent", "level"])
                                .required(true),
                        ),
                )
                .subcommand(
                    Command::new("show")
                        .about("Print the properties of an entity and its components")
                        .arg(scene_arg())
                        .arg(entity_arg()),
                )
                .subcommand(
                    Command::new("set")
                        .about("Set a property of an entity or one of its components")
                        .arg(scene_arg())
                        .arg(entity_arg())
                        .arg(
                            Arg::new("field")
                                .help("Field name")
                                .value_name("FIELD")
                                .required(true),
                        )
                        .arg(
                            Arg::new("value")
                                .help("New value, \"x, y, z\" for vectors and \"null\" to unset")
                                .value_name("VALUE")
                                .required(true),
                        )
                        .arg(
                            Arg::new("component")
                                .long("component")
                                .help("Index of the component to edit instead of the entity")
                                .value_name("INDEX")
                                .value_parser(clap::value_parser!(usize)),
                        ),
                ),
        )
        .subcommand(
            Command::new("model")
                .about("Attach models to entities")
                .subcommand_required(true)
                .subcommand(
                    Command::new("attach")
                        .about("Attach a model resource to an entity")
                        .arg(scene_arg())
                        .arg(entity_arg())
                        .arg(
                            Arg::new("model")
                                .help("Model resource id")
                                .value_name("MODEL_ID")
                                .value_parser(clap::value_parser!(u32))
                                .required(true),
                        ),
                )
                .subcommand(
                    Command::new("detach")
                        .about("Detach a model resource from an entity")
                        .arg(scene_arg())
                        .arg(entity_arg())
                        .arg(
                            Arg::new("model")
                                .help("Model resource id")
                                .value_name("MODEL_ID")
                                .value_parser(clap::value_parser!(u32))
                                .required(true),
                        ),
                ),
        )
        .subcommand(
            Command::new("camera")
                .about("Edit cameras")
                .subcommand_required(true)
                .subcommand(
                    Command::new("add")
                        .about("Add a camera component to an entity")
                        .arg(scene_arg())
                        .arg(entity_arg())
                        .arg(
                            Arg::new("main")
                                .long("main")
                                .help("Make it the main camera of the scene")
                                .action(ArgAction::SetTrue),
                        ),
                )
                .subcommand(
                    Command::new("main")
                        .about("Make a camera component the main camera of the scene")
                        .arg(scene_arg())
                        .arg(entity_arg())
                        .arg(
                            Arg::new("index")
                                .help("Component index")
                                .value_name("COMPONENT_INDEX")
                                .value_parser(clap::value_parser!(usize))
                                .required(true),
                        ),
                ),
        )
}
