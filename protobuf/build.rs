fn main() {
    println!("cargo:rerun-if-changed=./remotejobs.proto");
    tonic_build::configure()
        .build_client(true)
        .build_server(true)
        .compile(&["./remotejobs.proto"], &["."])
        .unwrap_or_else(|err| panic!("Failed to compile protos {:?}", err));
}
