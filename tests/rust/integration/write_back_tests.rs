/// Updates, deletes and transactional atomicity of `save_changes`.
use anyhow::Context;
use relmap::{EntityObject, EntityState, KeyValue, OrmError, QuerySpec, Value};

use super::common::{blogs, open, vehicles, zoo};

#[test]
fn test_detected_edit_is_written_back() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("zoo.db");
    let model = zoo();
    let dog = model.require("Dog")?.id;

    let mut writer = open(&model, &path);
    writer.add(EntityObject::new(dog).with("Name", "Rex").with("Breed", "Pug"))?;
    writer.save_changes()?;

    let mut editor = open(&model, &path);
    let rex = editor.query(&QuerySpec::new("Dog"))?[0];
    editor
        .get_mut(rex)
        .context("rex is tracked")?
        .set("Breed", "Beagle");
    assert_eq!(editor.save_changes()?, 1);
    assert_eq!(editor.state(rex), EntityState::Unchanged);
    // nothing left to write
    assert_eq!(editor.save_changes()?, 0);

    let mut reader = open(&model, &path);
    let dogs = reader.query(&QuerySpec::new("Dog"))?;
    let stored = reader.get(dogs[0]).context("dog is tracked")?;
    assert_eq!(stored.get("Breed"), &Value::Text("Beagle".into()));
    Ok(())
}

#[test]
fn test_joined_table_delete_removes_every_part() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vehicles.db");
    let model = vehicles();
    let sports = model.require("SportsCar").unwrap().id;
    let truck = model.require("Truck").unwrap().id;

    let mut writer = open(&model, &path);
    writer
        .add(
            EntityObject::new(sports)
                .with("Make", "Ferrari")
                .with("Doors", 2)
                .with("TopSpeed", 340),
        )
        .unwrap();
    writer
        .add(EntityObject::new(truck).with("Make", "Volvo").with("Payload", 20.0))
        .unwrap();
    writer.save_changes().unwrap();

    let mut editor = open(&model, &path);
    let ferrari = editor.query(&QuerySpec::new("SportsCar")).unwrap()[0];
    editor.remove(ferrari).unwrap();
    assert_eq!(editor.save_changes().unwrap(), 1);
    assert_eq!(editor.state(ferrari), EntityState::Detached);

    let mut reader = open(&model, &path);
    let remaining = reader.query(&QuerySpec::new("Vehicle")).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(reader.get(remaining[0]).unwrap().entity(), truck);
    assert!(reader.query(&QuerySpec::new("Car")).unwrap().is_empty());
}

#[test]
fn test_failed_batch_leaves_storage_and_tracker_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blogs.db");
    let model = blogs();
    let blog = model.require("Blog").unwrap().id;

    let mut writer = open(&model, &path);
    writer
        .add(EntityObject::new(blog).with("Id", 1).with("Title", "existing"))
        .unwrap();
    writer.save_changes().unwrap();

    // a second session does not know key 1 is taken
    let mut session = open(&model, &path);
    let fresh = session
        .add(EntityObject::new(blog).with("Title", "fresh"))
        .unwrap();
    let clash = session
        .add(EntityObject::new(blog).with("Id", 1).with("Title", "clash"))
        .unwrap();

    let err = session.save_changes().unwrap_err();
    assert!(matches!(err, OrmError::Storage(_)));
    assert_eq!(session.state(fresh), EntityState::Added);
    assert_eq!(session.state(clash), EntityState::Added);
    assert_eq!(session.get(fresh).unwrap().get("Id"), &Value::Null);

    let mut reader = open(&model, &path);
    let stored = reader.query(&QuerySpec::new("Blog")).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(
        reader.find("Blog", &KeyValue::Integer(1), &[]).unwrap(),
        Some(stored[0])
    );
    assert_eq!(
        reader.get(stored[0]).unwrap().get("Title"),
        &Value::Text("existing".into())
    );
}
