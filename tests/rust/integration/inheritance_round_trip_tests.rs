/// Write-then-read-back through every inheritance strategy.
use relmap::{EntityObject, EntityState, KeyValue, QuerySpec, SortDirection, Value};

use super::common::{blogs, kennel, open, polygons, shapes, vehicles, zoo};

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

#[test]
fn test_single_table_dog_and_cat_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("zoo.db");
    let model = zoo();
    let dog = model.require("Dog").unwrap().id;
    let cat = model.require("Cat").unwrap().id;

    let mut writer = open(&model, &path);
    writer
        .add(
            EntityObject::new(dog)
                .with("Name", "Rex")
                .with("Breed", "Labrador")
                .with("GoodBoy", true),
        )
        .unwrap();
    writer
        .add(EntityObject::new(cat).with("Name", "Tom").with("Lives", 9))
        .unwrap();
    assert_eq!(writer.save_changes().unwrap(), 2);

    let mut reader = open(&model, &path);
    let animals = reader.query(&QuerySpec::new("Animal")).unwrap();
    assert_eq!(animals.len(), 2);

    let dogs = reader.query(&QuerySpec::new("Dog")).unwrap();
    assert_eq!(dogs.len(), 1);
    let rex = reader.get(dogs[0]).unwrap();
    assert_eq!(rex.entity(), dog);
    assert_eq!(rex.get("Name"), &text("Rex"));
    assert_eq!(rex.get("Breed"), &text("Labrador"));
    assert_eq!(rex.get("GoodBoy"), &Value::Boolean(true));
    // no column bleed from the sibling type
    assert!(!rex.values().contains_key("Lives"));

    let cats = reader.query(&QuerySpec::new("Cat")).unwrap();
    assert_eq!(cats.len(), 1);
    assert_eq!(reader.get(cats[0]).unwrap().get("Lives"), &Value::Integer(9));
}

#[test]
fn test_single_table_three_level_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kennel.db");
    let model = kennel();
    let dog = model.require("Dog").unwrap().id;
    let puppy = model.require("Puppy").unwrap().id;
    let cat = model.require("Cat").unwrap().id;

    let mut writer = open(&model, &path);
    writer
        .add(EntityObject::new(dog).with("Name", "Rex").with("Breed", "Pug"))
        .unwrap();
    let bit = writer
        .add(
            EntityObject::new(puppy)
                .with("Name", "Bit")
                .with("Breed", "Corgi")
                .with("Toy", "ball"),
        )
        .unwrap();
    writer
        .add(EntityObject::new(cat).with("Name", "Tom").with("Lives", 9))
        .unwrap();
    writer.save_changes().unwrap();
    let bit_key = KeyValue::from_value(writer.get(bit).unwrap().get("Id")).unwrap();

    let mut reader = open(&model, &path);
    assert_eq!(reader.query(&QuerySpec::new("Animal")).unwrap().len(), 3);

    // the subtype's rows come back through the parent's discriminator list
    let dogs = reader.query(&QuerySpec::new("Dog")).unwrap();
    let types: Vec<_> = dogs.iter().map(|id| reader.get(*id).unwrap().entity()).collect();
    assert_eq!(types, vec![dog, puppy]);
    assert!(!reader.get(dogs[0]).unwrap().values().contains_key("Toy"));

    let puppies = reader.query(&QuerySpec::new("Puppy")).unwrap();
    assert_eq!(puppies, vec![dogs[1]]);
    let loaded = reader.get(puppies[0]).unwrap();
    assert_eq!(loaded.get("Name"), &text("Bit"));
    assert_eq!(loaded.get("Breed"), &text("Corgi"));
    assert_eq!(loaded.get("Toy"), &text("ball"));
    assert!(!loaded.values().contains_key("Lives"));
    assert_eq!(reader.find("Puppy", &bit_key, &[]).unwrap(), Some(puppies[0]));
}

#[test]
fn test_joined_table_three_level_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vehicles.db");
    let model = vehicles();
    let car = model.require("Car").unwrap().id;
    let sports = model.require("SportsCar").unwrap().id;
    let truck = model.require("Truck").unwrap().id;

    let mut writer = open(&model, &path);
    let golf = writer
        .add(EntityObject::new(car).with("Make", "VW").with("Doors", 5))
        .unwrap();
    let porsche = writer
        .add(
            EntityObject::new(sports)
                .with("Make", "Porsche")
                .with("Doors", 2)
                .with("TopSpeed", 310),
        )
        .unwrap();
    writer
        .add(EntityObject::new(truck).with("Make", "MAN").with("Payload", 18.5))
        .unwrap();
    writer.save_changes().unwrap();
    let porsche_key = KeyValue::from_value(writer.get(porsche).unwrap().get("Id")).unwrap();
    assert_ne!(writer.get(golf).unwrap().get("Id"), &Value::Null);

    let mut reader = open(&model, &path);
    // one object per stored entity, however deep the hierarchy
    let all = reader.query(&QuerySpec::new("Vehicle")).unwrap();
    assert_eq!(all.len(), 3);
    let types: Vec<_> = all.iter().map(|id| reader.get(*id).unwrap().entity()).collect();
    assert_eq!(types, vec![car, sports, truck]);

    let loaded = reader.find("SportsCar", &porsche_key, &[]).unwrap().unwrap();
    let object = reader.get(loaded).unwrap();
    assert_eq!(object.get("Make"), &text("Porsche"));
    assert_eq!(object.get("Doors"), &Value::Integer(2));
    assert_eq!(object.get("TopSpeed"), &Value::Integer(310));

    let cars = reader.query(&QuerySpec::new("Car")).unwrap();
    assert_eq!(cars.len(), 2);
    let trucks = reader.query(&QuerySpec::new("Truck")).unwrap();
    assert_eq!(reader.get(trucks[0]).unwrap().get("Payload"), &Value::Real(18.5));
}

#[test]
fn test_per_concrete_table_union_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shapes.db");
    let model = shapes();
    let circle = model.require("Circle").unwrap().id;
    let square = model.require("Square").unwrap().id;

    let mut writer = open(&model, &path);
    writer
        .add(EntityObject::new(circle).with("Color", "red").with("Radius", 1.5))
        .unwrap();
    writer
        .add(EntityObject::new(square).with("Color", "blue").with("Side", 2.0))
        .unwrap();
    writer.save_changes().unwrap();

    let mut reader = open(&model, &path);
    let shapes = reader.query(&QuerySpec::new("Shape")).unwrap();
    assert_eq!(shapes.len(), 2);
    for id in &shapes {
        let shape = reader.get(*id).unwrap();
        if shape.entity() == circle {
            assert_eq!(shape.get("Radius"), &Value::Real(1.5));
            assert!(!shape.values().contains_key("Side"));
        } else {
            assert_eq!(shape.entity(), square);
            assert_eq!(shape.get("Side"), &Value::Real(2.0));
            assert!(!shape.values().contains_key("Radius"));
        }
    }

    let first = reader
        .query(
            &QuerySpec::new("Shape")
                .order_by("Color", SortDirection::Asc)
                .limit(1),
        )
        .unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(reader.get(first[0]).unwrap().get("Color"), &text("blue"));

    let circles = reader.query(&QuerySpec::new("Circle")).unwrap();
    assert_eq!(circles.len(), 1);
}

#[test]
fn test_per_concrete_table_three_level_union_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("polygons.db");
    let model = polygons();
    let polygon = model.require("Polygon").unwrap().id;
    let square = model.require("Square").unwrap().id;
    let circle = model.require("Circle").unwrap().id;

    let mut writer = open(&model, &path);
    writer
        .add(EntityObject::new(polygon).with("Color", "green").with("Sides", 5))
        .unwrap();
    writer
        .add(
            EntityObject::new(square)
                .with("Color", "blue")
                .with("Sides", 4)
                .with("Side", 2.0),
        )
        .unwrap();
    writer
        .add(EntityObject::new(circle).with("Color", "red").with("Radius", 1.5))
        .unwrap();
    writer.save_changes().unwrap();

    let mut reader = open(&model, &path);
    let shapes = reader.query(&QuerySpec::new("Shape")).unwrap();
    assert_eq!(shapes.len(), 3);
    for id in &shapes {
        let shape = reader.get(*id).unwrap();
        match shape.entity() {
            e if e == polygon => {
                assert_eq!(shape.get("Sides"), &Value::Integer(5));
                assert!(!shape.values().contains_key("Side"));
                assert!(!shape.values().contains_key("Radius"));
            }
            e if e == square => {
                assert_eq!(shape.get("Sides"), &Value::Integer(4));
                assert_eq!(shape.get("Side"), &Value::Real(2.0));
            }
            e => {
                assert_eq!(e, circle);
                assert_eq!(shape.get("Radius"), &Value::Real(1.5));
                assert!(!shape.values().contains_key("Sides"));
            }
        }
    }

    // the concrete middle type reads its own table plus its subtype's
    let polygons = reader
        .query(&QuerySpec::new("Polygon").order_by("Sides", SortDirection::Asc))
        .unwrap();
    let types: Vec<_> = polygons.iter().map(|id| reader.get(*id).unwrap().entity()).collect();
    assert_eq!(types, vec![square, polygon]);
    // same instances as the first read
    assert!(polygons.iter().all(|id| shapes.contains(id)));

    let squares = reader.query(&QuerySpec::new("Square")).unwrap();
    assert_eq!(squares, vec![polygons[0]]);
}

#[test]
fn test_standalone_entity_round_trip_and_identity() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blogs.db");
    let model = blogs();
    let blog = model.require("Blog").unwrap().id;

    let mut writer = open(&model, &path);
    let id = writer
        .add(EntityObject::new(blog).with("Title", "Rust"))
        .unwrap();
    writer.save_changes().unwrap();
    assert_eq!(writer.state(id), EntityState::Unchanged);
    let key = KeyValue::from_value(writer.get(id).unwrap().get("Id")).unwrap();

    let mut reader = open(&model, &path);
    let first = reader.query(&QuerySpec::new("Blog")).unwrap();
    let second = reader.query(&QuerySpec::new("Blog")).unwrap();
    assert_eq!(first, second);
    assert_eq!(reader.find("Blog", &key, &[]).unwrap(), Some(first[0]));
    assert_eq!(reader.get(first[0]).unwrap().get("Title"), &text("Rust"));
    assert_eq!(reader.tracker().len(), 1);
}
