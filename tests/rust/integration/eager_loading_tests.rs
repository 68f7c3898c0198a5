/// Eager loading through LEFT JOINs and relationship fixup on both sides.
use relmap::{EntityObject, QuerySpec, Value};

use super::common::{blogs, open, zoo};

#[test]
fn test_collections_are_fixed_up_without_fan_out_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blogs.db");
    let model = blogs();
    let blog_type = model.require("Blog").unwrap().id;
    let post_type = model.require("Post").unwrap().id;
    let comment_type = model.require("Comment").unwrap().id;
    let contributor_type = model.require("Contributor").unwrap().id;

    let mut writer = open(&model, &path);
    let blog = writer
        .add(EntityObject::new(blog_type).with("Title", "Rust"))
        .unwrap();
    let first = writer
        .add(EntityObject::new(post_type).with("Title", "Ownership"))
        .unwrap();
    let second = writer
        .add(EntityObject::new(post_type).with("Title", "Lifetimes"))
        .unwrap();
    for post in [first, second] {
        writer.get_mut(post).unwrap().set_reference("Blog", Some(blog));
    }
    let comment = writer
        .add(EntityObject::new(comment_type).with("Body", "nice"))
        .unwrap();
    writer.get_mut(comment).unwrap().set_reference("Post", Some(first));
    for name in ["Ann", "Bob"] {
        let contributor = writer
            .add(EntityObject::new(contributor_type).with("Name", name))
            .unwrap();
        writer
            .get_mut(blog)
            .unwrap()
            .add_to_collection("Contributors", contributor);
    }
    assert_eq!(writer.save_changes().unwrap(), 6);

    let mut reader = open(&model, &path);
    let loaded = reader
        .query(
            &QuerySpec::new("Blog")
                .include("Posts.Comments")
                .include("Contributors"),
        )
        .unwrap();
    // two posts x two contributors worth of rows, still one blog
    assert_eq!(loaded.len(), 1);
    let blog = reader.get(loaded[0]).unwrap();
    let posts = blog.collection("Posts").to_vec();
    assert_eq!(posts.len(), 2);
    assert_eq!(blog.collection("Contributors").len(), 2);

    for post_id in &posts {
        let post = reader.get(*post_id).unwrap();
        assert_eq!(post.reference("Blog"), Some(loaded[0]));
        assert!(post.is_loaded("Comments"));
        let expected = if post.get("Title") == &Value::Text("Ownership".into()) { 1 } else { 0 };
        assert_eq!(post.collection("Comments").len(), expected);
        for comment in post.collection("Comments") {
            assert_eq!(reader.get(*comment).unwrap().reference("Post"), Some(*post_id));
        }
    }
}

#[test]
fn test_single_table_collection_and_reference_includes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("zoo.db");
    let model = zoo();
    let owner_type = model.require("Owner").unwrap().id;
    let dog_type = model.require("Dog").unwrap().id;
    let cat_type = model.require("Cat").unwrap().id;

    let mut writer = open(&model, &path);
    let owner = writer
        .add(EntityObject::new(owner_type).with("Name", "Ann"))
        .unwrap();
    let dog = writer
        .add(EntityObject::new(dog_type).with("Name", "Rex").with("Breed", "Pug"))
        .unwrap();
    let cat = writer
        .add(EntityObject::new(cat_type).with("Name", "Tom").with("Lives", 7))
        .unwrap();
    for pet in [dog, cat] {
        writer.get_mut(owner).unwrap().add_to_collection("Pets", pet);
    }
    writer
        .add(EntityObject::new(owner_type).with("Name", "Nobody"))
        .unwrap();
    writer.save_changes().unwrap();

    let mut reader = open(&model, &path);
    let owners = reader.query(&QuerySpec::new("Owner").include("Pets")).unwrap();
    assert_eq!(owners.len(), 2);
    let pets = reader.get(owners[0]).unwrap().collection("Pets").to_vec();
    assert_eq!(pets.len(), 2);
    let kinds: Vec<_> = pets.iter().map(|p| reader.get(*p).unwrap().entity()).collect();
    assert!(kinds.contains(&dog_type) && kinds.contains(&cat_type));
    for pet in &pets {
        assert_eq!(reader.get(*pet).unwrap().reference("Owner"), Some(owners[0]));
    }
    assert!(reader.get(owners[1]).unwrap().collection("Pets").is_empty());

    // same instances when reached from the other side
    let dogs = reader.query(&QuerySpec::new("Dog").include("Owner")).unwrap();
    assert_eq!(dogs.len(), 1);
    assert!(pets.contains(&dogs[0]));
    assert_eq!(reader.get(dogs[0]).unwrap().reference("Owner"), Some(owners[0]));
}
