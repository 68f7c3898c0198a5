use std::path::Path;
use std::sync::Arc;

use relmap::{
    EngineConfig, EntityDefinition, EntityModel, InheritanceStrategy, ModelBuilder,
    SqliteConnection, UnitOfWork, ValueType,
};

pub type Session = UnitOfWork<SqliteConnection>;

/// Open a unit of work over `path`, creating the schema on first use
pub fn open(model: &Arc<EntityModel>, path: &Path) -> Session {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = EngineConfig {
        database_path: path.display().to_string(),
        log_statements: true,
        ..Default::default()
    };
    let mut session = UnitOfWork::open(model.clone(), &config).expect("open database");
    session.create_schema().expect("create schema");
    session
}

/// Single-table `Animal` hierarchy owned by `Owner`
pub fn zoo() -> Arc<EntityModel> {
    let model = ModelBuilder::new()
        .entity(
            EntityDefinition::new("Owner")
                .table("Owners")
                .key("Id", ValueType::Integer)
                .scalar("Name", ValueType::Text)
                .collection("Pets", "Animal", "OwnerId"),
        )
        .entity(
            EntityDefinition::new("Animal")
                .table("Animals")
                .abstract_type()
                .strategy(InheritanceStrategy::SingleTable)
                .key("Id", ValueType::Integer)
                .scalar("Name", ValueType::Text)
                .scalar("OwnerId", ValueType::Integer)
                .reference("Owner", "Owner", "OwnerId"),
        )
        .entity(
            EntityDefinition::new("Dog")
                .base("Animal")
                .scalar("Breed", ValueType::Text)
                .scalar("GoodBoy", ValueType::Boolean),
        )
        .entity(
            EntityDefinition::new("Cat")
                .base("Animal")
                .scalar("Lives", ValueType::Integer),
        )
        .build()
        .expect("zoo model");
    Arc::new(model)
}

/// Joined-table `Vehicle` → `Car` → `SportsCar`, `Vehicle` → `Truck`
pub fn vehicles() -> Arc<EntityModel> {
    let model = ModelBuilder::new()
        .entity(
            EntityDefinition::new("Vehicle")
                .table("Vehicles")
                .abstract_type()
                .strategy(InheritanceStrategy::JoinedTable)
                .key("Id", ValueType::Integer)
                .scalar("Make", ValueType::Text),
        )
        .entity(
            EntityDefinition::new("Car")
                .table("Cars")
                .base("Vehicle")
                .scalar("Doors", ValueType::Integer),
        )
        .entity(
            EntityDefinition::new("SportsCar")
                .table("SportsCars")
                .base("Car")
                .scalar("TopSpeed", ValueType::Integer),
        )
        .entity(
            EntityDefinition::new("Truck")
                .table("Trucks")
                .base("Vehicle")
                .scalar("Payload", ValueType::Real),
        )
        .build()
        .expect("vehicle model");
    Arc::new(model)
}

/// Per-concrete-table `Shape` with `Circle` and `Square`
pub fn shapes() -> Arc<EntityModel> {
    let model = ModelBuilder::new()
        .entity(
            EntityDefinition::new("Shape")
                .abstract_type()
                .strategy(InheritanceStrategy::PerConcreteTable)
                .key("Id", ValueType::Integer)
                .scalar("Color", ValueType::Text),
        )
        .entity(
            EntityDefinition::new("Circle")
                .table("Circles")
                .base("Shape")
                .scalar("Radius", ValueType::Real),
        )
        .entity(
            EntityDefinition::new("Square")
                .table("Squares")
                .base("Shape")
                .scalar("Side", ValueType::Real),
        )
        .build()
        .expect("shape model");
    Arc::new(model)
}

/// `Blog` with `Posts` (each with `Comments`) and `Contributors`
pub fn blogs() -> Arc<EntityModel> {
    let model = ModelBuilder::new()
        .entity(
            EntityDefinition::new("Blog")
                .table("Blogs")
                .key("Id", ValueType::Integer)
                .scalar("Title", ValueType::Text)
                .collection("Posts", "Post", "BlogId")
                .collection("Contributors", "Contributor", "BlogId"),
        )
        .entity(
            EntityDefinition::new("Post")
                .table("Posts")
                .key("Id", ValueType::Integer)
                .scalar("Title", ValueType::Text)
                .scalar("BlogId", ValueType::Integer)
                .reference("Blog", "Blog", "BlogId")
                .collection("Comments", "Comment", "PostId"),
        )
        .entity(
            EntityDefinition::new("Comment")
                .table("Comments")
                .key("Id", ValueType::Integer)
                .scalar("Body", ValueType::Text)
                .scalar("PostId", ValueType::Integer)
                .reference("Post", "Post", "PostId"),
        )
        .entity(
            EntityDefinition::new("Contributor")
                .table("Contributors")
                .key("Id", ValueType::Integer)
                .scalar("Name", ValueType::Text)
                .scalar("BlogId", ValueType::Integer),
        )
        .build()
        .expect("blog model");
    Arc::new(model)
}

/// Single-table `Animal` → `Dog` → `Puppy`, with `Cat` beside `Dog`
pub fn kennel() -> Arc<EntityModel> {
    let model = ModelBuilder::new()
        .entity(
            EntityDefinition::new("Animal")
                .table("Animals")
                .abstract_type()
                .strategy(InheritanceStrategy::SingleTable)
                .key("Id", ValueType::Integer)
                .scalar("Name", ValueType::Text),
        )
        .entity(
            EntityDefinition::new("Dog")
                .base("Animal")
                .scalar("Breed", ValueType::Text),
        )
        .entity(
            EntityDefinition::new("Puppy")
                .base("Dog")
                .scalar("Toy", ValueType::Text),
        )
        .entity(
            EntityDefinition::new("Cat")
                .base("Animal")
                .scalar("Lives", ValueType::Integer),
        )
        .build()
        .expect("kennel model");
    Arc::new(model)
}

/// Per-concrete-table `Shape` → concrete `Polygon` → `Square`, plus `Circle`
pub fn polygons() -> Arc<EntityModel> {
    let model = ModelBuilder::new()
        .entity(
            EntityDefinition::new("Shape")
                .abstract_type()
                .strategy(InheritanceStrategy::PerConcreteTable)
                .key("Id", ValueType::Integer)
                .scalar("Color", ValueType::Text),
        )
        .entity(
            EntityDefinition::new("Polygon")
                .table("Polygons")
                .base("Shape")
                .scalar("Sides", ValueType::Integer),
        )
        .entity(
            EntityDefinition::new("Square")
                .table("Squares")
                .base("Polygon")
                .scalar("Side", ValueType::Real),
        )
        .entity(
            EntityDefinition::new("Circle")
                .table("Circles")
                .base("Shape")
                .scalar("Radius", ValueType::Real),
        )
        .build()
        .expect("polygon model");
    Arc::new(model)
}
