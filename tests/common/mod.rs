#![allow(dead_code)]

use dicom::core::{DataElement, PrimitiveValue, VR};
use dicom::object::{FileMetaTableBuilder, InMemDicomObject};
use dicom_dictionary_std::{tags, uids};
use std::{fs, fs::File, io::Write, path::Path};
use zip::{ZipWriter, write::SimpleFileOptions};

pub const SERIES_UID: &str = "1.2.826.0.1.3680043.2.1125.1";

/// Write a 16-bit monochrome slice with the given row-major pixels.
pub fn write_slice(path: &Path, rows: u16, columns: u16, pixels: &[u16]) {
    write_slice_in_series(path, SERIES_UID, rows, columns, pixels);
}

/// Like [`write_slice`], tagging the slice with `series_uid`.
pub fn write_slice_in_series(
    path: &Path,
    series_uid: &str,
    rows: u16,
    columns: u16,
    pixels: &[u16],
) {
    assert_eq!(pixels.len(), rows as usize * columns as usize);
    let digits: String = path
        .file_stem()
        .unwrap()
        .to_string_lossy()
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    let instance_uid = format!("{series_uid}.1{digits}");

    let mut obj = InMemDicomObject::new_empty();
    obj.put(DataElement::new(
        tags::SOP_CLASS_UID,
        VR::UI,
        PrimitiveValue::from(uids::CT_IMAGE_STORAGE),
    ));
    obj.put(DataElement::new(
        tags::SOP_INSTANCE_UID,
        VR::UI,
        PrimitiveValue::from(instance_uid.as_str()),
    ));
    obj.put(DataElement::new(
        tags::SERIES_INSTANCE_UID,
        VR::UI,
        PrimitiveValue::from(series_uid),
    ));
    obj.put(DataElement::new(
        tags::SAMPLES_PER_PIXEL,
        VR::US,
        PrimitiveValue::from(1_u16),
    ));
    obj.put(DataElement::new(
        tags::PHOTOMETRIC_INTERPRETATION,
        VR::CS,
        PrimitiveValue::from("MONOCHROME2"),
    ));
    obj.put(DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(rows)));
    obj.put(DataElement::new(
        tags::COLUMNS,
        VR::US,
        PrimitiveValue::from(columns),
    ));
    obj.put(DataElement::new(
        tags::BITS_ALLOCATED,
        VR::US,
        PrimitiveValue::from(16_u16),
    ));
    obj.put(DataElement::new(
        tags::BITS_STORED,
        VR::US,
        PrimitiveValue::from(16_u16),
    ));
    obj.put(DataElement::new(
        tags::HIGH_BIT,
        VR::US,
        PrimitiveValue::from(15_u16),
    ));
    obj.put(DataElement::new(
        tags::PIXEL_REPRESENTATION,
        VR::US,
        PrimitiveValue::from(0_u16),
    ));
    obj.put(DataElement::new(
        tags::PIXEL_DATA,
        VR::OW,
        PrimitiveValue::U16(pixels.to_vec().into()),
    ));

    let file = obj
        .with_meta(
            FileMetaTableBuilder::new()
                .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
                .media_storage_sop_class_uid(uids::CT_IMAGE_STORAGE)
                .media_storage_sop_instance_uid(instance_uid.as_str()),
        )
        .unwrap();
    file.write_to_file(path).unwrap();
}

/// Pixels of a `size`x`size` slice with a bright square on a zero background.
pub fn square_pixels(size: u16, x0: u16, y0: u16, side: u16, value: u16) -> Vec<u16> {
    let mut pixels = vec![0; size as usize * size as usize];
    for y in y0..y0 + side {
        for x in x0..x0 + side {
            pixels[y as usize * size as usize + x as usize] = value;
        }
    }
    pixels
}

/// Write `count` slices named `slice<N>.dcm` (N from 1) with a centered
/// square into `dir`.
pub fn write_square_series(dir: &Path, count: usize, size: u16) {
    fs::create_dir_all(dir).unwrap();
    let side = size / 2;
    let offset = size / 4;
    for n in 1..=count {
        let pixels = square_pixels(size, offset, offset, side, 1000 + n as u16);
        write_slice(&dir.join(format!("slice{n}.dcm")), size, size, &pixels);
    }
}

/// Zip every file of `dir` into `archive` under `folder/`.
pub fn zip_directory(dir: &Path, archive: &Path, folder: &str) {
    let mut writer = ZipWriter::new(File::create(archive).unwrap());
    let mut paths: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();
    for path in paths {
        let name = format!("{folder}/{}", path.file_name().unwrap().to_string_lossy());
        writer
            .start_file(name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(&fs::read(&path).unwrap()).unwrap();
    }
    writer.finish().unwrap();
}
