use crate::auth::Role;

pub const MAX_USERNAME_LEN: usize = 255;

/// Split on single spaces, lowercase every part and join them back together.
pub fn slugify(nama: &str) -> String {
    nama.split(' ').map(str::to_lowercase).collect()
}

/// `{prefix}_{slug}`, truncated to the username column width.
pub fn generate(role: Role, nama: &str) -> String {
    let username = format!("{}_{}", role.username_prefix(), slugify(nama));
    truncate(username)
}

fn truncate(username: String) -> String {
    if username.chars().count() <= MAX_USERNAME_LEN {
        username
    } else {
        username.chars().take(MAX_USERNAME_LEN).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_follow_the_role() {
        assert_eq!(generate(Role::Provinsi, "Jawa Barat"), "prov_jawabarat");
        assert_eq!(generate(Role::Kota, "Kota Bandung"), "kota_kotabandung");
        assert_eq!(generate(Role::Puskesmas, "Sehat Jaya"), "pusk_sehatjaya");
        assert_eq!(generate(Role::Kestrad, "Budi"), "kestrad_budi");
    }

    #[test]
    fn only_single_spaces_are_removed() {
        assert_eq!(slugify("Rumah  Sehat"), "rumahsehat");
        assert_eq!(slugify("A\tB"), "a\tb");
    }

    #[test]
    fn long_names_are_truncated() {
        let nama = "x".repeat(400);
        let username = generate(Role::Kestrad, &nama);
        assert_eq!(username.chars().count(), MAX_USERNAME_LEN);
        assert!(username.starts_with("kestrad_xxx"));
    }
}
