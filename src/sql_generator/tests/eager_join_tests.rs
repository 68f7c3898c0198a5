//! Eager-load join planning

use super::generator;
use crate::model::{Cardinality, EntityDefinition, InheritanceStrategy, ModelBuilder};
use crate::query::{IncludePath, QuerySpec};
use crate::sql_generator::{GenerationError, HierarchyShape};
use crate::test_fixtures::{blog_model, shape_model, zoo_model};
use crate::value::{Value, ValueType};

#[test]
fn test_nested_paths_chain_off_parent_alias() {
    let spec = QuerySpec::new("Blog")
        .include("Posts.Comments")
        .include("Contributors");
    let query = generator(blog_model()).select(&spec).unwrap();

    assert!(query.sql.contains(concat!(
        r#"FROM "Blogs" AS "t" "#,
        r#"LEFT JOIN "Posts" AS "j0" ON "t"."Id" = "j0"."BlogId" "#,
        r#"LEFT JOIN "Contributors" AS "j1" ON "t"."Id" = "j1"."BlogId" "#,
        r#"LEFT JOIN "Comments" AS "j2" ON "j0"."Id" = "j2"."PostId""#
    )));
    assert!(query.sql.contains(r#""t"."Title" AS "t_Title""#));
    assert!(query.sql.contains(r#""j0"."Title" AS "j0_Title""#));
    assert!(query.sql.contains(r#""j2"."Body" AS "j2_Body""#));

    let joins = &query.plan.joins;
    assert_eq!(joins.len(), 3);
    assert_eq!(joins[0].path.to_string(), "Posts");
    assert_eq!(joins[1].path.to_string(), "Contributors");
    assert_eq!(joins[2].path.to_string(), "Posts.Comments");
    assert_eq!(joins[2].parent_alias, "j0");
    assert!(joins.windows(2).all(|w| w[0].depth() <= w[1].depth()));
}

#[test]
fn test_shared_prefix_is_joined_once() {
    let spec = QuerySpec::new("Blog")
        .include("Posts")
        .include("Posts.Comments");
    let query = generator(blog_model()).select(&spec).unwrap();
    assert_eq!(query.plan.joins.len(), 2);
    assert_eq!(query.sql.matches(r#"LEFT JOIN "Posts""#).count(), 1);
}

#[test]
fn test_inverse_navigations_are_resolved_in_plan() {
    let spec = QuerySpec::new("Blog")
        .include("Posts.Comments")
        .include("Contributors");
    let query = generator(blog_model()).select(&spec).unwrap();
    let joins = &query.plan.joins;

    let posts_inverse = joins[0].inverse.as_ref().unwrap();
    assert_eq!(posts_inverse.name, "Blog");
    assert_eq!(posts_inverse.cardinality, Cardinality::Single);
    assert_eq!(posts_inverse.foreign_key, "BlogId");

    assert!(joins[1].inverse.is_none());
    assert_eq!(joins[2].inverse.as_ref().unwrap().name, "Post");
}

#[test]
fn test_single_valued_navigation_joins_on_foreign_key() {
    let query = generator(zoo_model())
        .select(&QuerySpec::new("Dog").include("Owner"))
        .unwrap();
    assert!(query
        .sql
        .contains(r#"LEFT JOIN "Owners" AS "j0" ON "t"."OwnerId" = "j0"."Id""#));
    assert_eq!(query.plan.joins[0].cardinality, Cardinality::Single);
    assert_eq!(query.plan.joins[0].inverse.as_ref().unwrap().name, "Pets");
}

#[test]
fn test_single_table_join_target_is_guarded_in_on_clause() {
    let query = generator(zoo_model())
        .select(&QuerySpec::new("Owner").include("Pets"))
        .unwrap();
    assert!(query.sql.contains(
        r#"LEFT JOIN "Animals" AS "j0" ON "t"."Id" = "j0"."OwnerId" AND "j0"."Discriminator" IN (@j0_Discriminator0, @j0_Discriminator1)"#
    ));
    assert!(!query.sql.contains("WHERE"));
    assert_eq!(query.params.len(), 2);
    assert!(query
        .params
        .values()
        .all(|v| matches!(v, Value::Text(t) if t == "Dog" || t == "Cat")));
}

#[test]
fn test_joined_table_target_anchors_at_foreign_key_table() {
    let model = ModelBuilder::new()
        .entity(
            EntityDefinition::new("Person")
                .table("People")
                .key("Id", ValueType::Integer)
                .collection("Cars", "Car", "OwnerId"),
        )
        .entity(
            EntityDefinition::new("Vehicle")
                .table("Vehicles")
                .abstract_type()
                .strategy(InheritanceStrategy::JoinedTable)
                .key("Id", ValueType::Integer)
                .scalar("OwnerId", ValueType::Integer),
        )
        .entity(
            EntityDefinition::new("Car")
                .table("Cars")
                .base("Vehicle")
                .scalar("Doors", ValueType::Integer),
        )
        .build()
        .unwrap();

    let query = generator(model)
        .select(&QuerySpec::new("Person").include("Cars"))
        .unwrap();
    assert!(query.sql.ends_with(concat!(
        r#"LEFT JOIN "Vehicles" AS "j0Vehicle" ON "t"."Id" = "j0Vehicle"."OwnerId" "#,
        r#"LEFT JOIN "Cars" AS "j0" ON "j0Vehicle"."Id" = "j0"."Id""#
    )));
    assert_eq!(query.plan.joins[0].group.shape, HierarchyShape::Joined);
}

#[test]
fn test_unknown_navigation_is_a_configuration_error() {
    let err = generator(blog_model())
        .select(&QuerySpec::new("Blog").include("Posts.Authors"))
        .unwrap_err();
    assert_eq!(
        err,
        GenerationError::InvalidIncludePath {
            path: "Posts.Authors".into(),
            segment: "Authors".into(),
        }
    );

    // scalar fields are not navigations either
    let err = generator(blog_model())
        .select(&QuerySpec::new("Blog").include("Title"))
        .unwrap_err();
    assert!(matches!(err, GenerationError::InvalidIncludePath { .. }));
}

#[test]
fn test_empty_segment_is_rejected() {
    let err = generator(blog_model())
        .select(&QuerySpec::new("Blog").include("Posts..Comments"))
        .unwrap_err();
    assert!(matches!(err, GenerationError::InvalidIncludePath { .. }));
}

#[test]
fn test_include_depth_is_bounded() {
    let path = IncludePath::new(
        ["Posts", "Blog"]
            .iter()
            .cycle()
            .take(9)
            .copied(),
    );
    let err = generator(blog_model())
        .select(&QuerySpec::new("Blog").include(path))
        .unwrap_err();
    assert!(matches!(
        err,
        GenerationError::IncludeTooDeep {
            depth: 9,
            max: 8,
            ..
        }
    ));
}

#[test]
fn test_abstract_per_concrete_table_target_cannot_be_joined() {
    let model = ModelBuilder::new()
        .entity(
            EntityDefinition::new("Canvas")
                .table("Canvases")
                .key("Id", ValueType::Integer)
                .collection("Shapes", "Shape", "CanvasId"),
        )
        .entity(
            EntityDefinition::new("Shape")
                .abstract_type()
                .strategy(InheritanceStrategy::PerConcreteTable)
                .key("Id", ValueType::Integer)
                .scalar("CanvasId", ValueType::Integer),
        )
        .entity(EntityDefinition::new("Circle").table("Circles").base("Shape"))
        .entity(EntityDefinition::new("Square").table("Squares").base("Shape"))
        .build()
        .unwrap();

    let err = generator(model)
        .select(&QuerySpec::new("Canvas").include("Shapes"))
        .unwrap_err();
    assert!(matches!(err, GenerationError::UnsupportedInclude { .. }));

    // the plain fixture has no navigations at all
    assert!(generator(shape_model())
        .select(&QuerySpec::new("Circle").include("Canvas"))
        .is_err());
}

#[test]
fn test_include_without_segments_is_rejected() {
    let spec = QuerySpec::new("Blog").include(IncludePath::new(Vec::<String>::new()));
    let err = generator(blog_model()).select(&spec).unwrap_err();
    assert!(matches!(err, GenerationError::InvalidIncludePath { .. }));
}

#[test]
fn test_root_alias_must_not_collide_with_join_aliases() {
    let spec = QuerySpec::new("Blog").alias("j0").include("Posts");
    let err = generator(blog_model()).select(&spec).unwrap_err();
    assert!(matches!(err, GenerationError::InvalidAlias { .. }));

    let spec = QuerySpec::new("Blog").alias("b\"x");
    let err = generator(blog_model()).select(&spec).unwrap_err();
    assert!(matches!(err, GenerationError::InvalidAlias { .. }));

    // a `j` prefix alone is fine
    assert!(generator(blog_model())
        .select(&QuerySpec::new("Blog").alias("journal").include("Posts"))
        .is_ok());
}

#[test]
fn test_paging_with_collection_include_is_rejected() {
    let spec = QuerySpec::new("Blog").include("Posts").limit(10);
    let err = generator(blog_model()).select(&spec).unwrap_err();
    assert_eq!(
        err,
        GenerationError::UnsupportedInclude {
            path: "Posts".into(),
            reason: "collection includes cannot be combined with limit or offset".into(),
        }
    );

    // single-valued includes keep one row per root
    let spec = QuerySpec::new("Post").include("Blog").limit(10).offset(5);
    assert!(generator(blog_model()).select(&spec).is_ok());
}
