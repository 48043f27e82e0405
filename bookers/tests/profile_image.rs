mod common;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};

use bookers::storage::{self, Upload};

fn png(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb([200u8, 10, 10])));
    let mut bytes = std::io::Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

#[test]
fn default_image_is_attached_once() {
    let mut conn = common::connection();
    let (_dir, disk) = common::disk();
    let alice = common::register(&mut conn, "alice");
    assert!(alice.profile_image(&mut conn).unwrap().is_none());

    let first = alice
        .get_profile_image(&mut conn, &disk, &common::assets_dir(), 100, 100)
        .unwrap();
    let blob = alice.profile_image(&mut conn).unwrap().expect("default attached");
    assert_eq!(blob.filename, "default-image.jpg");
    assert_eq!(blob.content_type, "image/jpeg");
    assert!(disk.exists(&blob.key));
    assert_eq!(first.content_type, "image/jpeg");
    assert!(first.width <= 100 && first.height <= 100);

    let second = alice
        .get_profile_image(&mut conn, &disk, &common::assets_dir(), 100, 100)
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(alice.profile_image(&mut conn).unwrap(), Some(blob));
}

#[test]
fn default_image_is_never_upscaled() {
    let mut conn = common::connection();
    let (_dir, disk) = common::disk();
    let alice = common::register(&mut conn, "alice");

    // The bundled placeholder is 200x200.
    let variant = alice
        .get_profile_image(&mut conn, &disk, &common::assets_dir(), 1000, 1000)
        .unwrap();
    assert_eq!((variant.width, variant.height), (200, 200));
}

#[test]
fn uploaded_image_is_resized_to_fit() {
    let mut conn = common::connection();
    let (_dir, disk) = common::disk();
    let alice = common::register(&mut conn, "alice");

    let bytes = png(400, 100);
    let blob = alice
        .attach_profile_image(
            &mut conn,
            &disk,
            &Upload {
                filename: "me.png",
                content_type: "image/png",
                bytes: &bytes,
            },
        )
        .unwrap();
    assert_eq!(blob.byte_size, bytes.len() as i64);
    assert_eq!(blob.checksum, storage::checksum(&bytes));

    let variant = alice
        .get_profile_image(&mut conn, &disk, &common::assets_dir(), 100, 100)
        .unwrap();
    assert_eq!((variant.width, variant.height), (100, 25));
    assert_eq!(variant.blob_key, blob.key);
    assert_eq!(image::image_dimensions(&variant.path).unwrap(), (100, 25));
}

#[test]
fn replacing_the_image_removes_the_old_blob() {
    let mut conn = common::connection();
    let (_dir, disk) = common::disk();
    let alice = common::register(&mut conn, "alice");

    let variant = alice
        .get_profile_image(&mut conn, &disk, &common::assets_dir(), 60, 60)
        .unwrap();
    let bytes = png(10, 10);
    let blob = alice
        .attach_profile_image(
            &mut conn,
            &disk,
            &Upload {
                filename: "me.png",
                content_type: "image/png",
                bytes: &bytes,
            },
        )
        .unwrap();
    assert_ne!(blob.key, variant.blob_key);
    assert!(!disk.exists(&variant.blob_key));
    assert!(!variant.path.exists());
    assert_eq!(alice.profile_image(&mut conn).unwrap(), Some(blob));

    assert!(alice.purge_profile_image(&mut conn, &disk).unwrap());
    assert!(alice.profile_image(&mut conn).unwrap().is_none());
    assert!(!alice.purge_profile_image(&mut conn, &disk).unwrap());
}

#[test]
fn zero_sized_request_is_rejected() {
    let mut conn = common::connection();
    let (_dir, disk) = common::disk();
    let alice = common::register(&mut conn, "alice");
    let err = alice
        .get_profile_image(&mut conn, &disk, &common::assets_dir(), 0, 100)
        .unwrap_err();
    assert!(err.validation_errors().unwrap().contains("width"));
    assert!(alice.profile_image(&mut conn).unwrap().is_none());
}
