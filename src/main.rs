//! x11setup - Main entry point
//!
//! Connects to an X display, performs the connection setup and prints what
//! the server advertised.

use std::env;
use std::path::PathBuf;
use std::process;

use x11setup::protocol::{HandshakeOutcome, Setup};
use x11setup::{handshake, Credential, DisplayName, Transport, XAuthority, VERSION};

fn print_usage() {
    println!("x11setup v{}", VERSION);
    println!("Performs the X11 connection setup and prints the server's reply");
    println!();
    println!("Usage: x11setup [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -display <name>       Display to connect to (default: $DISPLAY)");
    println!("  -auth <file>          Xauthority file (default: $XAUTHORITY or ~/.Xauthority)");
    println!("  -noauth               Connect without credentials");
    println!("  -h, --help            Show this help message");
    println!();
    println!("Examples:");
    println!("  x11setup -display :0");
    println!("  x11setup -display remotehost:1 -auth /tmp/xauth");
    println!();
}

#[derive(Debug, Default)]
struct Config {
    display: Option<String>,
    auth_file: Option<PathBuf>,
    no_auth: bool,
}

fn parse_args() -> Result<Config, String> {
    let mut config = Config::default();
    let args: Vec<String> = env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            "-display" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for -display".to_string());
                }
                config.display = Some(args[i].clone());
            }
            "-auth" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for -auth".to_string());
                }
                config.auth_file = Some(PathBuf::from(&args[i]));
            }
            "-noauth" => {
                config.no_auth = true;
            }
            arg => {
                return Err(format!("Unknown option: {}", arg));
            }
        }
        i += 1;
    }

    Ok(config)
}

fn load_credential(config: &Config, display: &DisplayName) -> Credential {
    if config.no_auth {
        return Credential::none();
    }

    let path = match config.auth_file.clone().or_else(XAuthority::path_from_env) {
        Some(path) => path,
        None => {
            log::warn!("Neither XAUTHORITY nor HOME is set, connecting without credentials");
            return Credential::none();
        }
    };

    match XAuthority::load(&path) {
        Ok(authority) => authority.credential_for(display),
        Err(e) => {
            log::warn!(
                "Could not read {}, proceeding without authorization: {}",
                path.display(),
                e
            );
            Credential::none()
        }
    }
}

fn print_setup(setup: &Setup) {
    println!("Vendor: {}", setup.vendor);
    println!("Protocol version: {}", setup.protocol_version);
    println!("Release number: {}", setup.release_number);
    println!(
        "Resource ID base/mask: 0x{:08x}/0x{:08x}",
        setup.resource_id_base, setup.resource_id_mask
    );
    println!("Motion buffer size: {}", setup.motion_buffer_size);
    println!("Maximum request length: {}", setup.maximum_request_length);
    println!(
        "Image byte order: {}, bitmap bit order: {}",
        setup.image_byte_order, setup.bitmap_format_bit_order
    );
    println!(
        "Bitmap scanline unit/pad: {}/{}",
        setup.bitmap_format_scanline_unit, setup.bitmap_format_scanline_pad
    );
    println!("Keycodes: {}", setup.keycodes);

    println!("Pixmap formats: {}", setup.pixmap_formats.len());
    for format in &setup.pixmap_formats {
        println!(
            "  depth {:2}, bits_per_pixel {:2}, scanline_pad {:2}",
            format.depth, format.bits_per_pixel, format.scanline_pad
        );
    }

    for (i, screen) in setup.roots.iter().enumerate() {
        println!();
        println!("Screen #{}:", i);
        println!("  root window: {}", screen.root.id());
        println!(
            "  dimensions: {}x{} pixels ({}x{} millimeters)",
            screen.width_in_pixels,
            screen.height_in_pixels,
            screen.width_in_millimeters,
            screen.height_in_millimeters
        );
        println!("  depth of root window: {} planes", screen.root_depth);
        println!("  default colormap: {}", screen.default_colormap.id());
        println!("  installed colormaps: {}", screen.installed_maps);
        println!(
            "  white/black pixel: 0x{:x}/0x{:x}",
            screen.white_pixel, screen.black_pixel
        );
        println!(
            "  backing stores: {:?}, save unders: {}",
            screen.backing_stores,
            if screen.save_unders { "yes" } else { "no" }
        );
        println!("  current input event mask: {}", screen.current_input_masks);
        match screen.visual(screen.root_visual) {
            Some(visual) => println!("  root visual: {} ({:?})", visual.visual_id, visual.class),
            None => println!("  root visual: {}", screen.root_visual),
        }

        for depth in &screen.allowed_depths {
            println!("  depth {}: {} visuals", depth.depth, depth.visuals.len());
            for visual in &depth.visuals {
                println!(
                    "    visual {} {:?}, {} bits/rgb, {} entries, masks 0x{:x} 0x{:x} 0x{:x}",
                    visual.visual_id,
                    visual.class,
                    visual.bits_per_rgb_value,
                    visual.colormap_entries,
                    visual.red_mask,
                    visual.green_mask,
                    visual.blue_mask
                );
            }
        }
    }
}

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command line arguments
    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {}", err);
            eprintln!();
            print_usage();
            process::exit(1);
        }
    };

    let display = match &config.display {
        Some(name) => DisplayName::parse(name),
        None => DisplayName::from_env(),
    };
    let display = match display {
        Ok(display) => display,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let credential = load_credential(&config, &display);

    log::info!("x11setup v{}", VERSION);
    log::info!("Display: {}", display);
    log::info!(
        "Authorization: {}",
        if credential.is_empty() {
            "none".to_string()
        } else {
            String::from_utf8_lossy(&credential.name).into_owned()
        }
    );

    let mut transport = match Transport::connect(&display) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: Failed to connect to display {}: {}", display, e);
            process::exit(1);
        }
    };

    match handshake(&mut transport, &credential) {
        Ok(HandshakeOutcome::Accepted(setup)) => {
            log::info!("Connection accepted");
            print_setup(&setup);
        }
        Ok(HandshakeOutcome::Refused {
            server_version,
            reason,
        }) => {
            eprintln!(
                "Connection refused by server (protocol {}): {}",
                server_version,
                reason.trim_end()
            );
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: Connection setup failed: {}", e);
            process::exit(1);
        }
    }
}
