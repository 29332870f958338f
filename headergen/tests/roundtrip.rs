use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("headergen-{}-{name}", std::process::id()))
}

#[test]
fn generate_embeds_whole_file() {
    let input = scratch_path("in.bin");
    let output = scratch_path("out.h");
    let bytes: Vec<u8> = (0u16..=255).map(|b| b as u8).cycle().take(600).collect();
    fs::write(&input, &bytes).unwrap();

    let n = headergen::generate(&input, &output, "g_model").unwrap();
    assert_eq!(n, bytes.len());

    let header = fs::read_to_string(&output).unwrap();
    assert!(header.contains("const uint8_t g_model[] = {"));
    assert!(header.contains(&format!("const uint32_t g_model_len = {};", bytes.len())));

    let decoded: Vec<u8> = header
        .split_once('{')
        .unwrap()
        .1
        .rsplit_once('}')
        .unwrap()
        .0
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| u8::from_str_radix(t.strip_prefix("0x").unwrap(), 16).unwrap())
        .collect();
    assert_eq!(decoded, bytes);

    fs::remove_file(&input).unwrap();
    fs::remove_file(&output).unwrap();
}

#[test]
fn missing_input_propagates_io_error() {
    let input = scratch_path("does-not-exist.bin");
    let output = scratch_path("never-written.h");

    let err = headergen::generate(&input, &output, "g_model").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
