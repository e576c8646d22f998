//! # Build Script
//!
//! Embeds the Windows application manifest (`app.manifest`, via `app.rc`) into the
//! `sw-paths` executable.
//!
//! The manifest controls:
//! - User Account Control (UAC) behavior. The recorder writes into `Program Files`
//!   style locations, so standalone runs request elevation up front. (When invoked
//!   as an MSI custom action the installer already owns elevation.)
//! - Windows Version Compatibility (identifying as Win10/11 compatible).

fn main() {
    // Embeds 'app.rc' (which pulls in 'app.manifest') as a Windows resource.
    // We ignore the result because if it fails, the tool still builds, just without the manifest.
    // embed-resource is a no-op when the target is not Windows.
    let _ = embed_resource::compile("app.rc", embed_resource::NONE);
}
