//! Shared entity models for unit tests

use crate::model::{EntityDefinition, EntityModel, InheritanceStrategy, ModelBuilder};
use crate::value::ValueType;

/// Abstract `Animal` (single table `Animals`) with `Dog` and `Cat`, plus an
/// `Owner` holding a collection of animals.
pub fn zoo_model() -> EntityModel {
    ModelBuilder::new()
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
                .discriminator_column("Discriminator")
                .key("Id", ValueType::Integer)
                .scalar("Name", ValueType::Text)
                .scalar("OwnerId", ValueType::Integer)
                .reference("Owner", "Owner", "OwnerId"),
        )
        .entity(
            EntityDefinition::new("Dog")
                .base("Animal")
                .scalar("Breed", ValueType::Text),
        )
        .entity(
            EntityDefinition::new("Cat")
                .base("Animal")
                .scalar("Lives", ValueType::Integer),
        )
        .build()
        .expect("zoo model should build")
}

/// Three-level joined-table hierarchy:
/// `Vehicle` (abstract) → `Car` → `SportsCar`, and `Vehicle` → `Truck`.
pub fn vehicle_model() -> EntityModel {
    ModelBuilder::new()
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
        .expect("vehicle model should build")
}

/// Per-concrete-table hierarchy: abstract `Shape` with `Circle` and `Square`
pub fn shape_model() -> EntityModel {
    ModelBuilder::new()
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
        .expect("shape model should build")
}

/// `Blog` → `Posts` → `Comments`, plus `Blog.Contributors` as a second
/// collection fanning out from the same root
pub fn blog_model() -> EntityModel {
    ModelBuilder::new()
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
        .expect("blog model should build")
}
